/// Semantic values built by grammar actions while matching
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum Value {
    Bool(bool),
    Char(char),
    I64(i64),
    F64(f64),
    String(String),
    List(Vec<Value>),
    Node { name: String, items: Vec<Value> },
}

impl Value {
    pub fn node(name: &str, items: Vec<Value>) -> Self {
        Value::Node {
            name: name.to_string(),
            items,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Appends `item` to a list or to the items of a node.  Returns
    /// the item back when `self` is not a container.
    pub fn append(&mut self, item: Value) -> Result<(), Value> {
        match self {
            Value::List(values) => values.push(item),
            Value::Node { items, .. } => items.push(item),
            _ => return Err(item),
        }
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
