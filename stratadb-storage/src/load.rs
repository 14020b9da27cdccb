//! Delimited-text ingestion.
//!
//! A [`Loader`] reads '|'-delimited records and exposes field-wise
//! scalar parsers; the `load_*` drivers walk the TPC-H lineitem and
//! orders layouts and push typed values into a row store or one push per
//! column. Decimal fields are scaled by 100 into integers, dates are
//! bit-packed into sortable u32 values.

use crate::col::store::ColumnStore;
use crate::error::{Error, Result};
use crate::row::RowStore;
use crate::value::{date_to_u32, VarStr};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use stratadb_catalog::{Attribute, Relation};

pub const DEFAULT_DELIMITER: char = '|';

/// Buffered record reader over delimited text.
pub struct Loader<R> {
    reader: R,
    delimiter: char,
    line: String,
}

impl Loader<BufReader<File>> {
    /// Open a file with the default '|' delimiter.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Loader::new(BufReader::new(file), DEFAULT_DELIMITER))
    }
}

impl<R: BufRead> Loader<R> {
    #[inline]
    pub fn new(reader: R, delimiter: char) -> Self {
        Loader {
            reader,
            delimiter,
            line: String::new(),
        }
    }

    /// Next record, or `None` at end of input. Blank lines terminate
    /// the input as well.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        let trimmed = self.line.trim_end_matches(['\n', '\r']);
        if n == 0 || trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Record {
            fields: trimmed.split(self.delimiter),
        }))
    }
}

/// One record split into fields, consumed left to right.
pub struct Record<'a> {
    fields: std::str::Split<'a, char>,
}

impl<'a> Record<'a> {
    #[inline]
    fn next_field(&mut self) -> Result<&'a str> {
        self.fields.next().ok_or(Error::InvalidFormat)
    }

    #[inline]
    pub fn read_str(&mut self) -> Result<&'a str> {
        self.next_field()
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.next_field()?.parse()?)
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.next_field()?.parse()?)
    }

    /// Single-character field.
    #[inline]
    pub fn read_char(&mut self) -> Result<u8> {
        let field = self.next_field()?;
        field.bytes().next().ok_or(Error::InvalidFormat)
    }

    /// Decimal with two fraction digits, scaled by 100 into an integer.
    pub fn read_fixed_point(&mut self) -> Result<i64> {
        let field = self.next_field()?;
        let negative = field.starts_with('-');
        match field.split_once('.') {
            Some((pre, post)) => {
                let pre: i64 = pre.parse()?;
                if post.len() < 2 {
                    return Err(Error::InvalidFormat);
                }
                let post: i64 = post[..2].parse()?;
                let scaled = pre.abs() * 100 + post;
                Ok(if negative { -scaled } else { scaled })
            }
            None => Ok(field.parse::<i64>()? * 100),
        }
    }

    /// `YYYY-MM-DD` packed into a sortable u32.
    pub fn read_date(&mut self) -> Result<u32> {
        let field = self.next_field()?;
        let mut parts = field.split('-');
        let year: u32 = parts.next().ok_or(Error::InvalidFormat)?.parse()?;
        let month: u32 = parts.next().ok_or(Error::InvalidFormat)?.parse()?;
        let day: u32 = parts.next().ok_or(Error::InvalidFormat)?.parse()?;
        Ok(date_to_u32(year, month, day))
    }
}

/// The TPC-H lineitem schema in `.tbl` column order. Decimal attributes
/// are declared as 8-byte integers (scaled by 100), date attributes as
/// 4-byte integers holding packed dates.
pub fn lineitem_relation() -> Relation {
    Relation::new(
        "lineitem",
        vec![
            Attribute::int4("orderkey"),
            Attribute::int4("partkey"),
            Attribute::int4("suppkey"),
            Attribute::int4("linenumber"),
            Attribute::int8("quantity"),
            Attribute::int8("extendedprice"),
            Attribute::int8("discount"),
            Attribute::int8("tax"),
            Attribute::char("returnflag", 1),
            Attribute::char("linestatus", 1),
            Attribute::int4("shipdate"),
            Attribute::int4("commitdate"),
            Attribute::int4("receiptdate"),
            Attribute::char("shipinstruct", 26),
            Attribute::char("shipmode", 11),
            Attribute::varchar("comment", 44),
        ],
    )
    .expect("lineitem relation is well formed")
}

/// The TPC-H orders schema in `.tbl` column order.
pub fn orders_relation() -> Relation {
    Relation::new(
        "orders",
        vec![
            Attribute::int4("orderkey"),
            Attribute::int4("custkey"),
            Attribute::char("orderstatus", 1),
            Attribute::int8("totalprice"),
            Attribute::int4("orderdate"),
            Attribute::char("orderpriority", 16),
            Attribute::char("clerk", 16),
            Attribute::int4("shippriority"),
            Attribute::varchar("comment", 79),
        ],
    )
    .expect("orders relation is well formed")
}

struct LineItem<'a> {
    orderkey: i32,
    partkey: i32,
    suppkey: i32,
    linenumber: i32,
    quantity: i64,
    extendedprice: i64,
    discount: i64,
    tax: i64,
    returnflag: u8,
    linestatus: u8,
    shipdate: i32,
    commitdate: i32,
    receiptdate: i32,
    shipinstruct: &'a str,
    shipmode: &'a str,
    comment: &'a str,
}

impl<'a> LineItem<'a> {
    fn parse(record: &mut Record<'a>) -> Result<Self> {
        Ok(LineItem {
            orderkey: record.read_i32()?,
            partkey: record.read_i32()?,
            suppkey: record.read_i32()?,
            linenumber: record.read_i32()?,
            quantity: record.read_i64()?,
            extendedprice: record.read_fixed_point()?,
            discount: record.read_fixed_point()?,
            tax: record.read_fixed_point()?,
            returnflag: record.read_char()?,
            linestatus: record.read_char()?,
            shipdate: record.read_date()? as i32,
            commitdate: record.read_date()? as i32,
            receiptdate: record.read_date()? as i32,
            shipinstruct: record.read_str()?,
            shipmode: record.read_str()?,
            comment: record.read_str()?,
        })
    }
}

/// Load lineitem records into a row store laid out over
/// [`lineitem_relation`]. Returns the number of rows loaded.
pub fn load_lineitem_rows<R: BufRead>(
    reader: R,
    store: &mut RowStore,
    max_rows: usize,
) -> Result<usize> {
    let mut loader = Loader::new(reader, DEFAULT_DELIMITER);
    let mut num_rows = 0;
    while num_rows != max_rows {
        let mut record = match loader.next_record()? {
            Some(r) => r,
            None => break,
        };
        let item = LineItem::parse(&mut record)?;

        let idx = store.append(1)?;
        let mut row = store.row_mut(idx);
        row.set::<i32>(0, item.orderkey);
        row.set::<i32>(1, item.partkey);
        row.set::<i32>(2, item.suppkey);
        row.set::<i32>(3, item.linenumber);
        row.set::<i64>(4, item.quantity);
        row.set::<i64>(5, item.extendedprice);
        row.set::<i64>(6, item.discount);
        row.set::<i64>(7, item.tax);
        row.set_bytes(8, &[item.returnflag]);
        row.set_bytes(9, &[item.linestatus]);
        row.set::<i32>(10, item.shipdate);
        row.set::<i32>(11, item.commitdate);
        row.set::<i32>(12, item.receiptdate);
        row.set_bytes(13, item.shipinstruct.as_bytes());
        row.set_bytes(14, item.shipmode.as_bytes());
        row.set_str(15, item.comment)?;
        num_rows += 1;
    }
    Ok(num_rows)
}

/// Load lineitem records into a naively typed column store built from
/// [`lineitem_relation`]. Returns the number of rows loaded.
pub fn load_lineitem_columns<R: BufRead>(
    reader: R,
    store: &mut ColumnStore,
    max_rows: usize,
) -> Result<usize> {
    let mut loader = Loader::new(reader, DEFAULT_DELIMITER);
    let mut num_rows = 0;
    while num_rows != max_rows {
        let mut record = match loader.next_record()? {
            Some(r) => r,
            None => break,
        };
        let item = LineItem::parse(&mut record)?;

        store.column_mut::<i32>(0).push(item.orderkey)?;
        store.column_mut::<i32>(1).push(item.partkey)?;
        store.column_mut::<i32>(2).push(item.suppkey)?;
        store.column_mut::<i32>(3).push(item.linenumber)?;
        store.column_mut::<i64>(4).push(item.quantity)?;
        store.column_mut::<i64>(5).push(item.extendedprice)?;
        store.column_mut::<i64>(6).push(item.discount)?;
        store.column_mut::<i64>(7).push(item.tax)?;
        store.bytes_column_mut(8).push_bytes(&[item.returnflag])?;
        store.bytes_column_mut(9).push_bytes(&[item.linestatus])?;
        store.column_mut::<i32>(10).push(item.shipdate)?;
        store.column_mut::<i32>(11).push(item.commitdate)?;
        store.column_mut::<i32>(12).push(item.receiptdate)?;
        store
            .bytes_column_mut(13)
            .push_bytes(item.shipinstruct.as_bytes())?;
        store
            .bytes_column_mut(14)
            .push_bytes(item.shipmode.as_bytes())?;
        store
            .column_mut::<VarStr>(15)
            .push(VarStr::new(item.comment))?;
        num_rows += 1;
    }
    Ok(num_rows)
}

/// Load orders records into a naively typed column store built from
/// [`orders_relation`]. Returns the number of rows loaded.
pub fn load_orders_columns<R: BufRead>(
    reader: R,
    store: &mut ColumnStore,
    max_rows: usize,
) -> Result<usize> {
    let mut loader = Loader::new(reader, DEFAULT_DELIMITER);
    let mut num_rows = 0;
    while num_rows != max_rows {
        let mut record = match loader.next_record()? {
            Some(r) => r,
            None => break,
        };
        let orderkey = record.read_i32()?;
        let custkey = record.read_i32()?;
        let orderstatus = record.read_char()?;
        let totalprice = record.read_fixed_point()?;
        let orderdate = record.read_date()? as i32;
        let orderpriority = record.read_str()?;
        let clerk = record.read_str()?;
        let shippriority = record.read_i32()?;
        let comment = record.read_str()?;

        store.column_mut::<i32>(0).push(orderkey)?;
        store.column_mut::<i32>(1).push(custkey)?;
        store.bytes_column_mut(2).push_bytes(&[orderstatus])?;
        store.column_mut::<i64>(3).push(totalprice)?;
        store.column_mut::<i32>(4).push(orderdate)?;
        store
            .bytes_column_mut(5)
            .push_bytes(orderpriority.as_bytes())?;
        store.bytes_column_mut(6).push_bytes(clerk.as_bytes())?;
        store.column_mut::<i32>(7).push(shippriority)?;
        store.column_mut::<VarStr>(8).push(VarStr::new(comment))?;
        num_rows += 1;
    }
    Ok(num_rows)
}
