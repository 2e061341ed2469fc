/// A parsed scene document: exactly one root node.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Node,
}

/// `Kind { key: value ... Child { ... } }`
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: String,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
    pub line: usize,
    pub col: usize,
}

impl Node {
    /// Returns the value of the first property named `key`.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub key: String,
    pub value: Value,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f32),
    /// `50%`, stored as the raw percentage (50.0).
    Percent(f32),
    /// Straight-alpha RGBA bytes from `#rrggbb` / `#rrggbbaa`.
    Color([u8; 4]),
    Ident(String),
    Str(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<[u8; 4]> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Percent(_) => "percentage",
            Value::Color(_) => "color",
            Value::Ident(_) => "identifier",
            Value::Str(_) => "string",
        }
    }
}
