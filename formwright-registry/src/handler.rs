use formwright_types::{is_empty_value, RuleKind, ValueShape};
use serde_json::Value;

/// Capability interface of a field type.
///
/// The registry stores one handler per type discriminator. The normalizer
/// resolves each schema node's handler exactly once; after that the compiler
/// and the store talk to the handler directly instead of re-dispatching on
/// the discriminator string.
///
/// Only [`value_shape`](FieldHandler::value_shape) is mandatory. The other
/// capabilities have permissive defaults.
pub trait FieldHandler: Send + Sync {
    /// The shape of values this field holds.
    fn value_shape(&self) -> ValueShape;

    /// Value assigned when a schema node omits `default`.
    fn default_value(&self) -> Value {
        Value::Null
    }

    /// Rule kinds a node of this type may declare.
    fn accepted_rules(&self) -> &[RuleKind] {
        &RuleKind::ALL
    }

    /// Whether the field holds several values at once (a list).
    fn multiple(&self) -> bool {
        false
    }

    /// Whether `value` may be stored in a field of this type.
    fn accepts(&self, value: &Value) -> bool {
        self.value_shape().admits(value)
    }

    /// Whether `value` counts as "not filled in" for presence rules.
    fn is_empty(&self, value: &Value) -> bool {
        is_empty_value(value)
    }

    /// Returns true if `kind` is in [`accepted_rules`](FieldHandler::accepted_rules).
    fn accepts_rule(&self, kind: RuleKind) -> bool {
        self.accepted_rules().contains(&kind)
    }
}

/// A data-only handler, enough for most host-defined field types.
///
/// ```
/// use formwright_registry::BasicHandler;
/// use formwright_types::{RuleKind, ValueShape};
///
/// let rating = BasicHandler::new(ValueShape::Number)
///     .with_default(serde_json::json!(0))
///     .with_rules(&[RuleKind::Required, RuleKind::Min, RuleKind::Max]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BasicHandler {
    shape: ValueShape,
    default: Value,
    rules: Vec<RuleKind>,
    multiple: bool,
}

impl BasicHandler {
    /// Creates a handler of the given shape accepting every rule kind.
    pub fn new(shape: ValueShape) -> Self {
        Self {
            shape,
            default: Value::Null,
            rules: RuleKind::ALL.to_vec(),
            multiple: false,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    /// Restricts the accepted rule kinds.
    pub fn with_rules(mut self, rules: &[RuleKind]) -> Self {
        self.rules = rules.to_vec();
        self
    }

    /// Marks the field as multi-valued.
    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }
}

impl FieldHandler for BasicHandler {
    fn value_shape(&self) -> ValueShape {
        self.shape
    }

    fn default_value(&self) -> Value {
        self.default.clone()
    }

    fn accepted_rules(&self) -> &[RuleKind] {
        &self.rules
    }

    fn multiple(&self) -> bool {
        self.multiple
    }
}
