// doc constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: char = '.';

// query operators
pub const OP_EQ: &str = "$eq";
pub const OP_NE: &str = "$ne";
pub const OP_GT: &str = "$gt";
pub const OP_GTE: &str = "$gte";
pub const OP_LT: &str = "$lt";
pub const OP_LTE: &str = "$lte";
pub const OP_IN: &str = "$in";
pub const OP_NIN: &str = "$nin";
pub const OP_EXISTS: &str = "$exists";
pub const OP_REGEX: &str = "$regex";
pub const OP_NOT: &str = "$not";
pub const OP_AND: &str = "$and";
pub const OP_OR: &str = "$or";
pub const OP_NOR: &str = "$nor";
pub const OPERATOR_PREFIX: char = '$';

// on-disk layout
pub const INDEX_DIR_NAME: &str = "indexes";
pub const COLLECTION_FILE_SUFFIX: &str = ".json";
pub const EQUALITY_INDEX_SUFFIX: &str = ".index.json";
pub const RANGE_INDEX_SUFFIX: &str = ".btree.json";
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

// encoded value tags
pub const STRING_TAG: &str = "s:";
pub const NUMBER_TAG: &str = "n:";
pub const BOOL_TAG: &str = "b:";
pub const JSON_TAG: &str = "j:";

// index constants
/// Open bound used for the missing side of a one-sided range query.
pub const RANGE_SENTINEL: f64 = 1e18;

// defaults
pub const DEFAULT_DB_PATH: &str = "./data";
pub const DEFAULT_BUCKET_COUNT: usize = 16;
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;
pub const DEFAULT_BTREE_MIN_DEGREE: usize = 3;
pub const DEFAULT_REGEX_CACHE_SIZE: usize = 64;

pub const FLATDOC_VERSION: &str = env!("CARGO_PKG_VERSION");
