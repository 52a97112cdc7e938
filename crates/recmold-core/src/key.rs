//! Key validity checks.
//!
//! A key is the ordered list of values of a record's key properties. The
//! first value must be present, and a composite key must be fully populated.

use crate::Result;
use crate::bag::PropertyAccess;
use crate::error::{Error, KeyErrorKind};
use crate::property::PropertySet;
use crate::record::TransferRecord;
use crate::value::Value;

/// Ordered key values of `record`.
///
/// Fails with `Undefined` when the record has no key properties, `Null` when
/// the first key value is null and `Incomplete` when any later one is.
pub fn key_values(record: &TransferRecord) -> Result<Vec<Value>> {
    let values = read_key(record)?;
    check_key(record.key_property_names(), &values)?;
    Ok(values)
}

/// Validate already-extracted key values against `keys`.
pub fn check_key(keys: &PropertySet, values: &[Value]) -> Result<()> {
    if keys.is_empty() {
        return Err(Error::key(KeyErrorKind::Undefined, None));
    }
    for (index, (name, value)) in keys.iter().zip(values).enumerate() {
        if value.is_null() {
            let kind = if index == 0 {
                KeyErrorKind::Null
            } else {
                KeyErrorKind::Incomplete
            };
            return Err(Error::key(kind, Some(name)));
        }
    }
    Ok(())
}

/// The populated prefix of `record`'s key.
///
/// Trailing nulls are dropped, so `[1, null]` yields `[1]`. A value after a
/// null still fails with `Incomplete`.
pub fn key_prefix(record: &TransferRecord) -> Result<Vec<Value>> {
    let keys = record.key_property_names();
    let values = read_key(record)?;
    if keys.is_empty() {
        return Err(Error::key(KeyErrorKind::Undefined, None));
    }
    if values.first().is_some_and(Value::is_null) {
        return Err(Error::key(KeyErrorKind::Null, keys.name_at(0)));
    }
    let populated = values.iter().take_while(|v| !v.is_null()).count();
    if let Some(offset) = values[populated..].iter().position(|v| !v.is_null()) {
        return Err(Error::key(
            KeyErrorKind::Incomplete,
            keys.name_at(populated + offset),
        ));
    }
    let mut values = values;
    values.truncate(populated);
    Ok(values)
}

fn read_key(record: &TransferRecord) -> Result<Vec<Value>> {
    record
        .key_property_names()
        .iter()
        .map(|name| record.get(name))
        .collect()
}
