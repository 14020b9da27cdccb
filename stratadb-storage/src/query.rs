//! Hand-written query consumers.
//!
//! Read-only scans and probes over the storage layer: a revenue
//! aggregation in both physical layouts, mode counting over compressed
//! runs, and index builders that associate keys of a loaded column with
//! row positions. Everything here goes through the public read APIs the
//! stores expose to query code.

use crate::col::store::ColumnStore;
use crate::compress::RleColumn;
use crate::index::{BPlusTree, HashMap};
use crate::row::RowStore;
use std::collections::HashMap as StdHashMap;
use std::hash::Hash;

/// Revenue aggregation over the lineitem row store: for rows shipped
/// before `date_threshold`, sum `extendedprice * (1 - discount) *
/// (1 + tax)` in fixed-point arithmetic. The result is in cents.
pub fn revenue_rows(store: &RowStore, date_threshold: u32) -> i64 {
    let mut result = 0i64;
    for row in store.rows() {
        if (row.get::<i32>(10) as u32) < date_threshold {
            let extendedprice = row.get::<i64>(5);
            let discount = row.get::<i64>(6);
            let tax = row.get::<i64>(7);
            result += extendedprice * (100 - discount) * (100 + tax) / 10_000;
        }
    }
    result
}

/// Same aggregation over the lineitem column store, touching only the
/// four columns involved.
pub fn revenue_columns(store: &ColumnStore, date_threshold: u32) -> i64 {
    let shipdate = store.column::<i32>(10).as_slice();
    let extendedprice = store.column::<i64>(5).as_slice();
    let discount = store.column::<i64>(6).as_slice();
    let tax = store.column::<i64>(7).as_slice();

    let mut result = 0i64;
    for i in 0..shipdate.len() {
        if (shipdate[i] as u32) < date_threshold {
            result += extendedprice[i] * (100 - discount[i]) * (100 + tax[i]) / 10_000;
        }
    }
    result
}

/// Most frequent value among `(value, count)` pairs, e.g. decoded RLE
/// runs. Ties resolve to the value seen first.
pub fn mode_count_runs<'a, T, I>(runs: I) -> Option<(&'a T, usize)>
where
    T: Eq + Hash + 'a,
    I: IntoIterator<Item = (&'a T, u32)>,
{
    let mut counts: StdHashMap<&T, usize> = StdHashMap::new();
    let mut order: Vec<&T> = Vec::new();
    for (value, count) in runs {
        let slot = counts.entry(value).or_insert_with(|| {
            order.push(value);
            0
        });
        *slot += count as usize;
    }
    let mut best: Option<(&T, usize)> = None;
    for value in order {
        let count = counts[value];
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((value, count)),
        }
    }
    best
}

/// Most frequent value of a plain element sequence.
pub fn mode_count_values<'a, T, I>(values: I) -> Option<(&'a T, usize)>
where
    T: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    mode_count_runs(values.into_iter().map(|v| (v, 1)))
}

/// Most frequent value of an RLE column, computed from runs only.
pub fn mode_count_rle<T>(col: &RleColumn<T>) -> Option<(&T, usize)>
where
    T: crate::col::Elem + PartialEq + Eq + Hash,
{
    mode_count_runs(col.runs().map(|r| (&r.value, r.count)))
}

/// Build a tree index from an ascending key column, mapping each key to
/// its row position. Keys must be sorted and the indexed store must
/// outlive any use of the returned positions.
pub fn index_keys_tree(keys: &crate::col::Column<i32>) -> BPlusTree<i32, usize> {
    BPlusTree::bulk_load(keys.iter().enumerate().map(|(pos, &k)| (k, pos)))
}

/// Build a hash index from a key column, mapping each key to its row
/// position. Later duplicates keep the first position.
pub fn index_keys_hash(keys: &crate::col::Column<i32>) -> HashMap<i32, usize> {
    let mut map = HashMap::with_capacity(keys.len() * 2);
    for (pos, &k) in keys.iter().enumerate() {
        map.insert(k, pos);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::col::store::ColumnStore;
    use crate::col::{BytesColumn, Column};
    use crate::compress::{compress_store, rle_dict_compress_chars};
    use crate::load::{lineitem_relation, load_lineitem_columns, load_lineitem_rows};
    use crate::value::date_to_u32;
    use std::io::Cursor;
    use stratadb_catalog::{Attribute, Relation};

    const LINEITEM_FIXTURE: &str = "\
1|156|4|1|17|17954.55|0.04|0.02|N|O|1996-03-13|1996-02-12|1996-03-22|DELIVER IN PERSON|TRUCK|egular courts above the|
1|68|9|2|36|34850.16|0.09|0.06|N|O|1996-04-12|1996-02-28|1996-04-20|TAKE BACK RETURN|MAIL|ly final dependencies|
2|107|2|1|38|38269.80|0.00|0.05|R|F|1997-01-28|1997-01-14|1997-02-02|TAKE BACK RETURN|RAIL|ven requests|
3|5|3|1|45|54058.05|0.06|0.00|R|F|1994-02-02|1994-01-04|1994-02-23|NONE|AIR|ongside of the furiously brave acco|
";

    #[test]
    fn test_revenue_same_in_both_layouts() {
        let rel = lineitem_relation();
        let mut rows = RowStore::naive(&rel);
        let mut cols = ColumnStore::new(&rel);
        load_lineitem_rows(Cursor::new(LINEITEM_FIXTURE), &mut rows, usize::MAX).unwrap();
        load_lineitem_columns(Cursor::new(LINEITEM_FIXTURE), &mut cols, usize::MAX).unwrap();

        let threshold = date_to_u32(1997, 1, 1);
        let by_rows = revenue_rows(&rows, threshold);
        let by_cols = revenue_columns(&cols, threshold);
        assert_eq!(by_rows, by_cols);
        // only the two 1996 rows pass the filter
        let expected = 1795455 * 96 * 102 / 10_000 + 3485016 * 91 * 106 / 10_000;
        assert_eq!(by_rows, expected);
    }

    /// A 3-attribute store loaded with 1,000 rows where the char column
    /// holds one of 7 distinct values in long runs: RLE leaves far fewer
    /// runs than rows and the mode count matches the uncompressed scan.
    #[test]
    fn test_mode_count_compressed_equals_uncompressed() {
        const SHIPMODES: [&str; 7] = ["AIR", "FOB", "MAIL", "RAIL", "REG AIR", "SHIP", "TRUCK"];
        let rel = Relation::new(
            "shipments",
            vec![
                Attribute::int4("id"),
                Attribute::char("shipmode", 11),
                Attribute::int8("amount"),
            ],
        )
        .unwrap();
        let mut store = ColumnStore::new(&rel);
        for i in 0..1000usize {
            // runs of ~37 elements cycling through the 7 values
            let mode = SHIPMODES[(i / 37) % SHIPMODES.len()];
            store.column_mut::<i32>(0).push(i as i32).unwrap();
            store.bytes_column_mut(1).push_bytes(mode.as_bytes()).unwrap();
            store.column_mut::<i64>(2).push(i as i64 * 100).unwrap();
        }

        let compressed = rle_dict_compress_chars(store.bytes_column(1)).unwrap();
        assert_eq!(compressed.len(), 1000);
        assert!(compressed.num_runs() < 100);
        assert_eq!(compressed.dictionary().len(), 7);

        let (mode_c, count_c) = mode_count_runs(compressed.runs()).unwrap();
        let decoded: Vec<_> = compressed.iter().cloned().collect();
        let (mode_u, count_u) = mode_count_values(decoded.iter()).unwrap();
        assert_eq!(mode_c.as_str(), mode_u.as_str());
        assert_eq!(count_c, count_u);
    }

    #[test]
    fn test_mode_count_rle_char_column() {
        let mut col = BytesColumn::new(1);
        for b in [b'N', b'N', b'R', b'R', b'R', b'A', b'N'] {
            col.push_bytes(&[b]).unwrap();
        }
        let rle = crate::compress::rle_compress_char(&col).unwrap();
        let (value, count) = mode_count_rle(&rle).unwrap();
        assert_eq!((*value, count), (b'R', 3));
    }

    #[test]
    fn test_compress_store_preserves_aggregation() {
        let rel = lineitem_relation();
        let mut cols = ColumnStore::new(&rel);
        load_lineitem_columns(Cursor::new(LINEITEM_FIXTURE), &mut cols, usize::MAX).unwrap();
        let compressed = compress_store(&rel, &cols).unwrap();
        assert_eq!(compressed.len(), cols.len());
        // compressed store exposes logical iteration equal to the plain column
        let plain: Vec<i64> = cols.column::<i64>(4).iter().copied().collect();
        let rle = compressed
            .column_dyn(4)
            .as_any()
            .downcast_ref::<RleColumn<i64>>()
            .unwrap();
        let decoded: Vec<i64> = rle.iter().copied().collect();
        assert_eq!(plain, decoded);
    }

    #[test]
    fn test_key_indexes_point_and_range() {
        let mut keys: Column<i32> = Column::new();
        for k in (0..500).map(|i| i * 2) {
            keys.push(k).unwrap();
        }

        let tree = index_keys_tree(&keys);
        assert_eq!(*tree.find(&24).unwrap().value(), 12);
        assert!(tree.find(&25).is_none());
        let in_range: Vec<i32> = tree.range(&10, &20).map(|(k, _)| *k).collect();
        assert_eq!(in_range, vec![10, 12, 14, 16, 18, 20]);

        let map = index_keys_hash(&keys);
        assert_eq!(map.get(&24), Some(&12));
        assert_eq!(map.get(&25), None);
    }
}
