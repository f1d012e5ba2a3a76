use crate::value::Value;
use crate::visitor::{walk_items, Visitor};

/// `Debug` output, pretty printed
pub fn raw(value: &Value) -> String {
    format!("{:#?}", value)
}

/// Single line output: `name[a, b]` for nodes, `[a, b]` for lists
pub fn compact(value: &Value) -> String {
    let mut f = CompactFormatter::default();
    f.visit_value(value);
    f.output
}

/// One value per line, the items of containers nested within braces
pub fn indented(value: &Value) -> String {
    let mut f = IndentedFormatter::default();
    f.visit_value(value);
    f.output
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Bool(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::F64(v) => format!("{:?}", v),
        Value::String(v) => format!("{:?}", v),
        // containers never reach this function
        _ => String::new(),
    }
}

#[derive(Default)]
struct CompactFormatter {
    output: String,
}

impl CompactFormatter {
    fn items(&mut self, items: &[Value]) {
        self.output.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.visit_value(item);
        }
        self.output.push(']');
    }
}

impl<'a> Visitor<'a> for CompactFormatter {
    fn visit_list(&mut self, items: &'a [Value]) {
        self.items(items);
    }

    fn visit_node(&mut self, name: &'a str, items: &'a [Value]) {
        self.output.push_str(name);
        self.items(items);
    }

    fn visit_scalar(&mut self, n: &'a Value) {
        self.output.push_str(&scalar(n));
    }
}

#[derive(Default)]
struct IndentedFormatter {
    output: String,
    level: usize,
}

impl IndentedFormatter {
    fn line(&mut self, text: &str) {
        self.output.push_str(&"    ".repeat(self.level));
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn block(&mut self, header: &str, items: &[Value]) {
        self.line(header);
        self.level += 1;
        walk_items(self, items);
        self.level -= 1;
        self.line("}");
    }
}

impl<'a> Visitor<'a> for IndentedFormatter {
    fn visit_list(&mut self, items: &'a [Value]) {
        self.block("{", items);
    }

    fn visit_node(&mut self, name: &'a str, items: &'a [Value]) {
        self.block(&format!("{} {{", name), items);
    }

    fn visit_scalar(&mut self, n: &'a Value) {
        self.line(&scalar(n));
    }
}
