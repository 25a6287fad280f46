mod arena;
mod handle;
mod node;
mod raw_bptree_map;

pub(crate) use handle::Handle;
pub(crate) use raw_bptree_map::RawBpTreeMap;
