//! Column store: one independently growable column per attribute.

use crate::col::{AnyColumn, BytesColumn, Column, Elem};
use crate::value::VarStr;
use std::fmt;
use stratadb_catalog::{AttrType, Relation};

/// Column-major store. Attributes are addressed by the dense offsets the
/// relation assigned; each column grows on its own. All columns hold the
/// same number of elements whenever a query observes the store; the store
/// does not enforce this in the middle of a multi-column append.
pub struct ColumnStore {
    columns: Vec<Box<dyn AnyColumn>>,
}

impl ColumnStore {
    /// Build a store with one naively typed column per attribute:
    /// integers and floats by declared width, Varchar as owning strings,
    /// Char(N) as untyped fixed-width byte elements.
    pub fn new(relation: &Relation) -> Self {
        let mut columns: Vec<Box<dyn AnyColumn>> = Vec::with_capacity(relation.len());
        for attr in relation {
            let column: Box<dyn AnyColumn> = match attr.attr_type {
                AttrType::Int => match attr.size {
                    1 => Box::new(Column::<i8>::new()),
                    2 => Box::new(Column::<i16>::new()),
                    4 => Box::new(Column::<i32>::new()),
                    _ => Box::new(Column::<i64>::new()),
                },
                AttrType::Float => Box::new(Column::<f32>::new()),
                AttrType::Double => Box::new(Column::<f64>::new()),
                AttrType::Char => Box::new(BytesColumn::new(attr.size)),
                AttrType::Varchar => Box::new(Column::<VarStr>::new()),
            };
            columns.push(column);
        }
        ColumnStore { columns }
    }

    /// Build a store from explicitly constructed columns, e.g. compressed
    /// ones. Column order must follow attribute offsets.
    #[inline]
    pub fn from_columns(columns: Vec<Box<dyn AnyColumn>>) -> Self {
        ColumnStore { columns }
    }

    /// Number of attributes.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows, taken from the first column.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.columns.first().map(|c| c.capacity()).unwrap_or(0)
    }

    /// Bytes used across all columns, dynamic payloads included.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.size_in_bytes()).sum()
    }

    #[inline]
    pub fn capacity_in_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.capacity_in_bytes()).sum()
    }

    /// Untyped view of the column at `offset`.
    #[inline]
    pub fn column_dyn(&self, offset: usize) -> &dyn AnyColumn {
        &*self.columns[offset]
    }

    /// Typed view of the column at `offset`.
    ///
    /// Caller must name the element type the store was built with at this
    /// offset; a mismatch is a caller bug and fails fast.
    #[inline]
    pub fn column<T: Elem>(&self, offset: usize) -> &Column<T> {
        self.columns[offset]
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("column {} element type mismatch", offset))
    }

    #[inline]
    pub fn column_mut<T: Elem>(&mut self, offset: usize) -> &mut Column<T> {
        self.columns[offset]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("column {} element type mismatch", offset))
    }

    /// Untyped byte view of a Char(N) column at `offset`.
    #[inline]
    pub fn bytes_column(&self, offset: usize) -> &BytesColumn {
        self.columns[offset]
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("column {} is not a bytes column", offset))
    }

    #[inline]
    pub fn bytes_column_mut(&mut self, offset: usize) -> &mut BytesColumn {
        self.columns[offset]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("column {} is not a bytes column", offset))
    }
}

impl fmt::Display for ColumnStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnStore ({} columns: [", self.columns.len())?;
        for (i, col) in self.columns.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}/{}", col.len(), col.capacity())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratadb_catalog::Attribute;

    fn sample_relation() -> Relation {
        Relation::new(
            "sample",
            vec![
                Attribute::int4("id"),
                Attribute::char("tag", 11),
                Attribute::int8("amount"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_store_layout_from_relation() {
        let rel = sample_relation();
        let mut store = ColumnStore::new(&rel);
        assert_eq!(store.num_columns(), 3);
        assert_eq!(store.len(), 0);

        store.column_mut::<i32>(0).push(1).unwrap();
        store.bytes_column_mut(1).push_bytes(b"TRUCK").unwrap();
        store.column_mut::<i64>(2).push(100).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.size_in_bytes(), 4 + 11 + 8);
    }

    #[test]
    fn test_typed_access_roundtrip() {
        let rel = sample_relation();
        let mut store = ColumnStore::new(&rel);
        for i in 0..50 {
            store.column_mut::<i32>(0).push(i).unwrap();
            store.bytes_column_mut(1).push_bytes(b"A").unwrap();
            store.column_mut::<i64>(2).push(i as i64 * 10).unwrap();
        }
        assert_eq!(store.column::<i32>(0).get(7), Some(&7));
        assert_eq!(store.column::<i64>(2).get(49), Some(&490));
        assert_eq!(store.bytes_column(1).get_bytes(0).unwrap()[0], b'A');
    }

    #[test]
    #[should_panic(expected = "element type mismatch")]
    fn test_type_mismatch_fails_fast() {
        let rel = sample_relation();
        let store = ColumnStore::new(&rel);
        let _ = store.column::<u64>(0);
    }

    #[test]
    fn test_from_columns_explicit() {
        let mut id: Column<u32> = Column::new();
        id.push(1).unwrap();
        id.push(2).unwrap();
        let store = ColumnStore::from_columns(vec![Box::new(id)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.column::<u32>(0).as_slice(), &[1, 2]);
    }
}
