use crate::value::Value;

pub trait Visitor<'a>: Sized {
    fn visit_value(&mut self, n: &'a Value) {
        walk_value(self, n);
    }

    fn visit_list(&mut self, items: &'a [Value]) {
        walk_items(self, items);
    }

    fn visit_node(&mut self, _name: &'a str, items: &'a [Value]) {
        walk_items(self, items);
    }

    fn visit_scalar(&mut self, _: &'a Value) {}
}

pub fn walk_value<'a, V: Visitor<'a>>(visitor: &mut V, n: &'a Value) {
    match n {
        Value::List(items) => visitor.visit_list(items),
        Value::Node { name, items } => visitor.visit_node(name, items),
        scalar => visitor.visit_scalar(scalar),
    }
}

pub fn walk_items<'a, V: Visitor<'a>>(visitor: &mut V, items: &'a [Value]) {
    for v in items {
        visitor.visit_value(v)
    }
}
