use chunk::Value;

/// The aggregate-function hook used by [`crate::redistribute_aggregate`]
/// (§4.5 "use an aggregate function's `mergeIfNeeded`/`accumulateIfNeeded`").
///
/// A trait object rather than a closure: concrete aggregates (sum, max,
/// count, …) are small, named, reusable pieces of state-free logic, the same
/// shape the catalog would hand an operator for a `GROUP BY`-style query.
pub trait AggregateMerge: std::fmt::Debug + Send + Sync {
    /// First contribution seen at a position: turn the raw cell value into
    /// the aggregate's running state (e.g. `count` turns any non-null value
    /// into `1`).
    fn accumulate(&self, incoming: &Value) -> Value;

    /// Fold `incoming` into `existing`, which already holds a running
    /// aggregate state produced by a prior `accumulate`/`merge` call.
    fn merge(&self, existing: &Value, incoming: &Value) -> Value;
}

/// `sum(v)`: running total of non-null contributions.
#[derive(Debug, Default)]
pub struct SumMerge;

impl AggregateMerge for SumMerge {
    fn accumulate(&self, incoming: &Value) -> Value {
        incoming.clone()
    }

    fn merge(&self, existing: &Value, incoming: &Value) -> Value {
        match (existing.as_double(), incoming.as_double()) {
            (Some(a), Some(b)) => Value::Double(a + b),
            (Some(a), None) => Value::Double(a),
            (None, Some(b)) => Value::Double(b),
            (None, None) => Value::Null,
        }
    }
}

/// `max(v)`: running maximum of non-null contributions.
#[derive(Debug, Default)]
pub struct MaxMerge;

impl AggregateMerge for MaxMerge {
    fn accumulate(&self, incoming: &Value) -> Value {
        incoming.clone()
    }

    fn merge(&self, existing: &Value, incoming: &Value) -> Value {
        if incoming > existing {
            incoming.clone()
        } else {
            existing.clone()
        }
    }
}

/// `count(v)`: number of non-null contributions seen at a position.
#[derive(Debug, Default)]
pub struct CountMerge;

impl AggregateMerge for CountMerge {
    fn accumulate(&self, incoming: &Value) -> Value {
        if incoming.is_null() {
            Value::Int64(0)
        } else {
            Value::Int64(1)
        }
    }

    fn merge(&self, existing: &Value, incoming: &Value) -> Value {
        let prev = existing.as_int64().unwrap_or(0);
        let bump = if incoming.is_null() { 0 } else { 1 };
        Value::Int64(prev + bump)
    }
}
