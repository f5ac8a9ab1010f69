use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    catalog::ExpressionCatalog,
    config::ResolverConfig,
    cursor::{ResultCursor, RowData},
    executor::{ExpressionResolver, ResolveError, RowAccessError},
    model::{BoundExpression, NO_ROW, RowIdentity},
};

/// Read-only view of the cursor's current row, addressed by binding name.
///
/// Values are cached for the row they were computed on. The first lookup
/// after the cursor moves drops every cached value at once.
///
/// Not meant for sharing: one cache per cursor, driven from the thread that
/// advances the cursor.
pub struct RowValueCache<'a> {
    cursor: &'a dyn ResultCursor,
    catalog: &'a dyn ExpressionCatalog,
    resolver: ExpressionResolver<'a>,
    config: ResolverConfig,
    current_row: RowIdentity,
    values: HashMap<String, Value>,
}

impl<'a> RowValueCache<'a> {
    pub fn new(
        cursor: &'a dyn ResultCursor,
        catalog: &'a dyn ExpressionCatalog,
        resolver: ExpressionResolver<'a>,
    ) -> Self {
        let config = ResolverConfig {
            row_position_name: resolver.row_position_name().to_string(),
            ..ResolverConfig::default()
        };
        Self {
            cursor,
            catalog,
            resolver,
            config,
            current_row: NO_ROW,
            values: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.resolver.set_config(&config);
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Value of the binding `name` for the cursor's current row.
    ///
    /// Never fails: unknown names, resolution errors and coercion errors
    /// all come back as `Value::Null`.
    pub fn get(&mut self, name: &str) -> Value {
        let row_index = match self.cursor.current_row_identity() {
            Ok(row_index) => Some(row_index),
            Err(e) => {
                debug!(name, error = %e, "row identity unavailable, resolving without cache");
                None
            }
        };
        self.sync_row(row_index);

        if self.config.is_raw_field(name) {
            return self.raw_field(name);
        }

        if let Some(row_index) = row_index {
            if let Some(value) = self.values.get(name) {
                trace!(name, row_index, "row cache hit");
                return value.clone();
            }
        }

        let Some(expr) = self.catalog.lookup(name) else {
            trace!(name, "no binding with this name");
            return Value::Null;
        };
        let value = self.resolve_or_null(name, expr, row_index.unwrap_or(NO_ROW), self.cursor.current_row());

        if row_index.is_some() {
            self.values.insert(name.to_string(), value.clone());
        }
        value
    }

    /// Drop the cached values once they no longer belong to the cursor's
    /// row. An unknown identity invalidates them too.
    fn sync_row(&mut self, row_index: Option<RowIdentity>) {
        let next = match row_index {
            Some(row_index) if row_index == self.current_row => return,
            Some(row_index) => row_index,
            None if self.values.is_empty() => return,
            None => NO_ROW,
        };
        trace!(from = self.current_row, to = next, dropped = self.values.len(), "row changed, clearing cache");
        self.values.clear();
        self.current_row = next;
    }

    /// Whether `name` is a known binding. Says nothing about the cache.
    pub fn has(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    /// Evaluate `name` against `row` instead of the cursor's current row.
    /// Nothing is cached and the row position reads as `NO_ROW`.
    ///
    /// In legacy mode the field at `index` is returned as-is and a failed
    /// read is an error; otherwise failures come back as `Value::Null`.
    pub fn value_of(&self, row: &dyn RowData, index: usize, name: &str) -> Result<Value, ResolveError> {
        if self.config.legacy_mode {
            return Ok(row.field_by_index(index)?.clone());
        }
        if self.config.is_raw_field(name) {
            return Ok(row.field_by_name(name).cloned().unwrap_or(Value::Null));
        }
        Ok(match self.catalog.lookup(name) {
            Some(expr) => self.resolve_or_null(name, expr, NO_ROW, Some(row)),
            None => Value::Null,
        })
    }

    pub fn get_by_index(&self, _index: usize) -> Result<Value, RowAccessError> {
        Err(RowAccessError::NotSupported("Get value by index"))
    }

    pub fn has_index(&self, _index: usize) -> Result<bool, RowAccessError> {
        Err(RowAccessError::NotSupported("Index lookup"))
    }

    pub fn put_by_index(&mut self, _index: usize, _value: Value) -> Result<(), RowAccessError> {
        Err(RowAccessError::NotSupported("Put value"))
    }

    pub fn put_by_name(&mut self, _name: &str, _value: Value) -> Result<(), RowAccessError> {
        Err(RowAccessError::NotSupported("Put value"))
    }

    /// Whether `name` currently holds a cached value (for the last row seen).
    pub fn is_cached(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Row the cached values belong to.
    pub fn cached_row(&self) -> RowIdentity {
        self.current_row
    }

    fn raw_field(&self, name: &str) -> Value {
        self.cursor
            .current_row()
            .and_then(|row| row.field_by_name(name).ok())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn resolve_or_null(
        &self,
        name: &str,
        expr: &BoundExpression,
        row_index: RowIdentity,
        row: Option<&dyn RowData>,
    ) -> Value {
        match self.resolver.resolve(expr, row_index, row) {
            Ok(value) => value,
            Err(e) if e.is_recoverable() => {
                debug!(name, row_index, error = %e, "expression failed, using empty value");
                Value::Null
            }
            Err(e) => {
                warn!(name, row_index, error = %e, "invalid expression binding");
                Value::Null
            }
        }
    }
}
