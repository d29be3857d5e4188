mod index_operations;
mod read_operations;
mod write_operations;

pub(crate) use index_operations::*;
pub(crate) use read_operations::*;
pub(crate) use write_operations::*;
