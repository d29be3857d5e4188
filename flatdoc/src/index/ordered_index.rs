use crate::collection::Document;
use crate::common::{Value, DEFAULT_BTREE_MIN_DEGREE};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};

type NodeId = usize;

const LEAF: &str = "leaf";
const KEYS: &str = "keys";
const IDS: &str = "ids";
const CHILDREN: &str = "children";

#[derive(Debug, Clone)]
struct Node {
    leaf: bool,
    keys: Vec<f64>,
    postings: Vec<Vec<String>>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(leaf: bool) -> Self {
        Node {
            leaf,
            keys: Vec::new(),
            postings: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Position of the first key not less than `key`.
    fn lower_bound(&self, key: f64) -> usize {
        self.keys.partition_point(|k| *k < key)
    }
}

/// A B-tree mapping numeric keys to the ids of the documents holding them.
///
/// The tree of minimum degree `t` keeps every non-root node between `t - 1`
/// and `2t - 1` keys. Full nodes are split on the way down during an insert,
/// so the leaf reached always has room, and the tree only grows at the root.
/// Inserting a key that is already present appends the id to its posting
/// list instead of adding a key.
///
/// Nodes live in an arena and refer to their children by position in it.
/// There is no delete: postings stay until the index is rebuilt.
///
/// NaN keys have no place in the ordering and are ignored.
#[derive(Debug, Clone)]
pub struct OrderedIndex {
    nodes: Vec<Node>,
    root: NodeId,
    min_degree: usize,
    key_count: usize,
}

impl OrderedIndex {
    /// Creates an empty index of minimum degree `min_degree` (at least 2).
    pub fn new(min_degree: usize) -> Self {
        let min_degree = if min_degree < 2 {
            log::warn!("B-tree minimum degree {} is below 2, using 2", min_degree);
            2
        } else {
            min_degree
        };

        OrderedIndex {
            nodes: vec![Node::new(true)],
            root: 0,
            min_degree,
            key_count: 0,
        }
    }

    /// Rebuilds an index from its serialized form.
    pub fn from_value(value: &Value, min_degree: usize) -> FlatDocResult<Self> {
        let mut index = OrderedIndex::new(min_degree);
        index.deserialize(value)?;
        Ok(index)
    }

    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of levels, 1 for a tree made of its root leaf.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.nodes[self.root];
        while !node.leaf {
            node = &self.nodes[node.children[0]];
            height += 1;
        }
        height
    }

    fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    fn is_full(&self, id: NodeId) -> bool {
        self.nodes[id].keys.len() >= self.max_keys()
    }

    /// Adds `id` under `key`. NaN and infinite keys cannot be persisted and
    /// are skipped.
    pub fn insert(&mut self, key: f64, id: &str) {
        if !key.is_finite() {
            log::warn!("Skipping non-finite key {} for document {}", key, id);
            return;
        }

        if let Some((node, position)) = self.locate(key) {
            self.nodes[node].postings[position].push(id.to_string());
            return;
        }

        if self.is_full(self.root) {
            let old_root = self.root;
            let mut new_root = Node::new(false);
            new_root.children.push(old_root);
            self.nodes.push(new_root);
            self.root = self.nodes.len() - 1;
            self.split_child(self.root, 0);
        }

        self.insert_non_full(self.root, key, id);
        self.key_count += 1;
    }

    fn insert_non_full(&mut self, start: NodeId, key: f64, id: &str) {
        let mut current = start;
        loop {
            let mut position = self.nodes[current].lower_bound(key);
            if self.nodes[current].leaf {
                let node = &mut self.nodes[current];
                node.keys.insert(position, key);
                node.postings.insert(position, vec![id.to_string()]);
                return;
            }

            if self.is_full(self.nodes[current].children[position]) {
                self.split_child(current, position);
                if key > self.nodes[current].keys[position] {
                    position += 1;
                }
            }
            current = self.nodes[current].children[position];
        }
    }

    /// Splits the full child at `position` of `parent`. The child keeps the
    /// lower half, a new right sibling takes the upper half and the median
    /// moves up into `parent`.
    fn split_child(&mut self, parent: NodeId, position: usize) {
        let t = self.min_degree;
        let child = self.nodes[parent].children[position];

        let (sibling, median_key, median_postings) = {
            let node = &mut self.nodes[child];
            let mut sibling = Node::new(node.leaf);
            sibling.keys = node.keys.split_off(t);
            sibling.postings = node.postings.split_off(t);
            if !node.leaf {
                sibling.children = node.children.split_off(t);
            }
            let median_key = node.keys.pop();
            let median_postings = node.postings.pop();
            (sibling, median_key, median_postings)
        };

        self.nodes.push(sibling);
        let sibling = self.nodes.len() - 1;

        if let (Some(key), Some(postings)) = (median_key, median_postings) {
            let node = &mut self.nodes[parent];
            node.keys.insert(position, key);
            node.postings.insert(position, postings);
            node.children.insert(position + 1, sibling);
        }
    }

    /// Finds the node and slot holding exactly `key`.
    fn locate(&self, key: f64) -> Option<(NodeId, usize)> {
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let position = node.lower_bound(key);
            if position < node.keys.len() && node.keys[position] == key {
                return Some((current, position));
            }
            if node.leaf {
                return None;
            }
            current = node.children[position];
        }
    }

    /// Ids stored under exactly `key`, in insertion order.
    pub fn search(&self, key: f64) -> Vec<String> {
        match self.locate(key) {
            Some((node, position)) => self.nodes[node].postings[position].clone(),
            None => Vec::new(),
        }
    }

    /// Ids of every key between `low` and `high`, in ascending key order.
    /// Each bound is exclusive unless its `include_` flag is set.
    pub fn range_search(
        &self,
        low: f64,
        high: f64,
        include_low: bool,
        include_high: bool,
    ) -> Vec<String> {
        let mut result = Vec::new();
        let bounds = RangeBounds {
            low,
            high,
            include_low,
            include_high,
        };
        self.collect_range(self.root, &bounds, &mut result);
        result
    }

    fn collect_range(&self, id: NodeId, bounds: &RangeBounds, result: &mut Vec<String>) {
        let node = &self.nodes[id];
        for (position, key) in node.keys.iter().enumerate() {
            if !node.leaf && *key > bounds.low {
                self.collect_range(node.children[position], bounds, result);
            }
            if bounds.contains(*key) {
                result.extend(node.postings[position].iter().cloned());
            }
            if *key >= bounds.high {
                return;
            }
        }
        if !node.leaf {
            if let Some(last) = node.children.last() {
                self.collect_range(*last, bounds, result);
            }
        }
    }

    /// Encodes the tree as nested `{leaf, keys, ids, children}` objects,
    /// `children` only on internal nodes.
    pub fn serialize(&self) -> FlatDocResult<Value> {
        self.serialize_node(self.root)
    }

    fn serialize_node(&self, id: NodeId) -> FlatDocResult<Value> {
        let node = &self.nodes[id];
        let mut doc = Document::new();
        doc.put(LEAF, node.leaf)?;
        doc.put(KEYS, node.keys.clone())?;
        doc.put(IDS, node.postings.clone())?;
        if !node.leaf {
            let children = node
                .children
                .iter()
                .map(|child| self.serialize_node(*child))
                .collect::<FlatDocResult<Vec<Value>>>()?;
            doc.put(CHILDREN, children)?;
        }
        Ok(Value::Document(doc))
    }

    /// Replaces this tree with a serialized one. The persisted shape is kept
    /// as is; only its structural consistency is checked.
    pub fn deserialize(&mut self, value: &Value) -> FlatDocResult<()> {
        let mut nodes = Vec::new();
        let mut key_count = 0;
        let root = load_node(value, &mut nodes, &mut key_count)?;
        self.nodes = nodes;
        self.root = root;
        self.key_count = key_count;
        Ok(())
    }

    /// Verifies key order, node occupancy, leaf depth and separator bounds of
    /// the whole tree.
    pub fn check_invariants(&self) -> FlatDocResult<()> {
        let mut leaf_depth = None;
        self.check_node(
            self.root,
            true,
            f64::NEG_INFINITY,
            f64::INFINITY,
            1,
            &mut leaf_depth,
        )
    }

    fn check_node(
        &self,
        id: NodeId,
        is_root: bool,
        lower: f64,
        upper: f64,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> FlatDocResult<()> {
        let node = &self.nodes[id];
        let count = node.keys.len();
        if count > self.max_keys() || (!is_root && count < self.min_degree - 1) {
            return Err(corrupted(&format!(
                "node holds {} keys, allowed {}..={}",
                count,
                self.min_degree - 1,
                self.max_keys()
            )));
        }
        if node.postings.len() != count {
            return Err(corrupted("postings do not match keys"));
        }
        if node.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(corrupted("keys are not strictly increasing"));
        }
        if node.keys.iter().any(|k| *k <= lower || *k >= upper) {
            return Err(corrupted("key outside of its separator bounds"));
        }

        if node.leaf {
            if !node.children.is_empty() {
                return Err(corrupted("leaf with children"));
            }
            match *leaf_depth {
                Some(expected) if expected != depth => {
                    return Err(corrupted("leaves at different depths"))
                }
                Some(_) => {}
                None => *leaf_depth = Some(depth),
            }
            return Ok(());
        }

        if node.children.len() != count + 1 {
            return Err(corrupted("internal node child count mismatch"));
        }
        for (position, child) in node.children.iter().enumerate() {
            let child_lower = if position == 0 {
                lower
            } else {
                node.keys[position - 1]
            };
            let child_upper = if position == count {
                upper
            } else {
                node.keys[position]
            };
            self.check_node(
                *child,
                false,
                child_lower,
                child_upper,
                depth + 1,
                leaf_depth,
            )?;
        }
        Ok(())
    }
}

impl Default for OrderedIndex {
    fn default() -> Self {
        OrderedIndex::new(DEFAULT_BTREE_MIN_DEGREE)
    }
}

struct RangeBounds {
    low: f64,
    high: f64,
    include_low: bool,
    include_high: bool,
}

impl RangeBounds {
    fn contains(&self, key: f64) -> bool {
        let above = if self.include_low {
            key >= self.low
        } else {
            key > self.low
        };
        let below = if self.include_high {
            key <= self.high
        } else {
            key < self.high
        };
        above && below
    }
}

fn corrupted(message: &str) -> FlatDocError {
    log::error!("Corrupted range index: {}", message);
    FlatDocError::new(
        &format!("Corrupted range index: {}", message),
        ErrorKind::IndexCorrupted,
    )
}

fn load_node(value: &Value, nodes: &mut Vec<Node>, key_count: &mut usize) -> FlatDocResult<NodeId> {
    let doc = value.as_document().ok_or_else(|| {
        corrupted(&format!("node is {}, not an object", value.type_name()))
    })?;

    let leaf = doc
        .get(LEAF)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| corrupted("node without a boolean 'leaf'"))?;

    let keys = doc
        .get(KEYS)
        .and_then(|v| v.as_array())
        .ok_or_else(|| corrupted("node without a 'keys' array"))?
        .iter()
        .map(|k| k.as_f64().ok_or_else(|| corrupted("non numeric key")))
        .collect::<FlatDocResult<Vec<f64>>>()?;

    let postings = doc
        .get(IDS)
        .and_then(|v| v.as_array())
        .ok_or_else(|| corrupted("node without an 'ids' array"))?
        .iter()
        .map(|list| {
            list.as_array()
                .ok_or_else(|| corrupted("posting list is not an array"))?
                .iter()
                .map(|id| {
                    id.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| corrupted("document id is not a string"))
                })
                .collect::<FlatDocResult<Vec<String>>>()
        })
        .collect::<FlatDocResult<Vec<Vec<String>>>>()?;

    if postings.len() != keys.len() {
        return Err(corrupted(&format!(
            "{} keys but {} posting lists",
            keys.len(),
            postings.len()
        )));
    }

    let mut children = Vec::new();
    if !leaf {
        let encoded = doc
            .get(CHILDREN)
            .and_then(|v| v.as_array())
            .ok_or_else(|| corrupted("internal node without a 'children' array"))?;
        if encoded.len() != keys.len() + 1 {
            return Err(corrupted(&format!(
                "{} keys but {} children",
                keys.len(),
                encoded.len()
            )));
        }
        for child in encoded {
            children.push(load_node(child, nodes, key_count)?);
        }
    }

    *key_count += keys.len();
    nodes.push(Node {
        leaf,
        keys,
        postings,
        children,
    });
    Ok(nodes.len() - 1)
}
