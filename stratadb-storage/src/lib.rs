pub mod buffer;
pub mod col;
pub mod compress;
pub mod config;
pub mod error;
pub mod index;
pub mod load;
pub mod query;
pub mod row;
pub mod value;

pub mod prelude {
    pub use crate::buffer::{Growth, RawBuf};
    pub use crate::col::store::ColumnStore;
    pub use crate::col::{AnyColumn, BytesColumn, Column};
    pub use crate::compress::{DictColumn, RleColumn, RleDictColumn, Run};
    pub use crate::config::StorageConfig;
    pub use crate::error::*;
    pub use crate::index::{BPlusTree, HashMap, HashTable};
    pub use crate::row::RowStore;
    pub use crate::value::*;
}
