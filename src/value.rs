//! Dynamic value model.
//!
//! Containers that may take part in shared or cyclic structure (`Seq`, `Map`, `Object`)
//! are `Rc<RefCell<_>>`: the read path creates them empty, registers their anchor and
//! only then fills them, so children can point back at their parent. `Array` is built in
//! one step once its length is known and is immutable afterwards.
//!
//! Equality is structural and terminates on cyclic graphs. Cloning a `Value` clones the
//! handle, not the container, so clones share identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

pub type SeqRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<Mapping>>;
pub type ObjectRef = Rc<RefCell<Object>>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Enum(EnumValue),
    Seq(SeqRef),
    Array(Rc<[Value]>),
    Map(MapRef),
    Object(ObjectRef),
    Custom(CustomValue),
}

/// One variant of a schema enum. `variant` is the declared (member) name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub ty: Arc<str>,
    pub variant: Arc<str>,
}

/// Ordered key/value entries. Keys are compared structurally, so lookups are linear.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<(Value, Value)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace, keeping the original position of a replaced key.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

/// Instance of a schema object type. Fields are keyed by member name.
#[derive(Clone)]
pub struct Object {
    pub ty: Arc<str>,
    pub fields: IndexMap<Arc<str>, Value>,
}

impl Object {
    pub fn new(ty: impl Into<Arc<str>>) -> Self {
        Object {
            ty: ty.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, member: &str) -> Option<&Value> {
        self.fields.get(member)
    }

    pub fn set(&mut self, member: impl Into<Arc<str>>, value: Value) -> Option<Value> {
        self.fields.insert(member.into(), value)
    }
}

/// Opaque payload produced by a type converter or a self-describing type.
pub trait CustomData: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_data(&self, other: &dyn CustomData) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq> CustomData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_data(&self, other: &dyn CustomData) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }
}

#[derive(Clone)]
pub struct CustomValue {
    pub ty: Arc<str>,
    data: Rc<dyn CustomData>,
}

impl CustomValue {
    pub fn new<T: CustomData>(ty: impl Into<Arc<str>>, data: T) -> Self {
        CustomValue {
            ty: ty.into(),
            data: Rc::new(data),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    pub fn data(&self) -> &dyn CustomData {
        &*self.data
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.data.eq_data(&*other.data)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.ty, self.data)
    }
}

fn rc_addr<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn seq(items: Vec<Value>) -> Value {
        Value::Seq(Rc::new(RefCell::new(items)))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::from(items))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn object(object: Object) -> Value {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn enumeration(ty: &str, variant: &str) -> Value {
        Value::Enum(EnumValue {
            ty: Arc::from(ty),
            variant: Arc::from(variant),
        })
    }

    pub fn custom<T: CustomData>(ty: &str, data: T) -> Value {
        Value::Custom(CustomValue::new(ty, data))
    }

    /// Reference identity of shareable containers, `None` for everything else.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Seq(rc) => Some(rc_addr(rc)),
            Value::Array(rc) => Some(rc_addr(rc)),
            Value::Map(rc) => Some(rc_addr(rc)),
            Value::Object(rc) => Some(rc_addr(rc)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqRef> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_custom<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(c) => c.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Member field of an object value, cloned out of the cell.
    pub fn field(&self, member: &str) -> Option<Value> {
        let object = self.as_object()?;
        let object = object.try_borrow().ok()?;
        object.get(member).cloned()
    }

    /// Short description of the value's kind, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "string".into(),
            Value::Bytes(_) => "bytes".into(),
            Value::Enum(e) => format!("enum `{}`", e.ty),
            Value::Seq(_) => "sequence".into(),
            Value::Array(_) => "array".into(),
            Value::Map(_) => "mapping".into(),
            Value::Object(o) => match o.try_borrow() {
                Ok(o) => format!("object `{}`", o.ty),
                Err(_) => "object".into(),
            },
            Value::Custom(c) => format!("`{}`", c.ty),
        }
    }

    /// Null or the zero value of a scalar type.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    /// Collection or string without items.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::Seq(s) => s.try_borrow().is_ok_and(|s| s.is_empty()),
            Value::Array(a) => a.is_empty(),
            Value::Map(m) => m.try_borrow().is_ok_and(|m| m.is_empty()),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Identity pairs currently under comparison; meeting one again means the graphs agree
/// along that cycle.
type SeenPairs = Vec<(usize, usize)>;

fn values_eq(a: &Value, b: &Value, seen: &mut SeenPairs) -> bool {
    if let (Some(ia), Some(ib)) = (a.identity(), b.identity()) {
        if ia == ib || seen.contains(&(ia, ib)) {
            return true;
        }
        seen.push((ia, ib));
        let equal = containers_eq(a, b, seen);
        seen.pop();
        return equal;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        // NaN compares equal to itself so that round trips of .nan hold
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Enum(x), Value::Enum(y)) => x == y,
        (Value::Custom(x), Value::Custom(y)) => x == y,
        _ => false,
    }
}

fn slices_eq(a: &[Value], b: &[Value], seen: &mut SeenPairs) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_eq(x, y, seen))
}

fn containers_eq(a: &Value, b: &Value, seen: &mut SeenPairs) -> bool {
    match (a, b) {
        (Value::Seq(x), Value::Seq(y)) => match (x.try_borrow(), y.try_borrow()) {
            (Ok(x), Ok(y)) => slices_eq(&x, &y, seen),
            _ => false,
        },
        (Value::Array(x), Value::Array(y)) => slices_eq(x, y, seen),
        (Value::Map(x), Value::Map(y)) => match (x.try_borrow(), y.try_borrow()) {
            (Ok(x), Ok(y)) => {
                x.len() == y.len()
                    && x.entries.iter().zip(&y.entries).all(|((kx, vx), (ky, vy))| {
                        values_eq(kx, ky, seen) && values_eq(vx, vy, seen)
                    })
            }
            _ => false,
        },
        (Value::Object(x), Value::Object(y)) => match (x.try_borrow(), y.try_borrow()) {
            (Ok(x), Ok(y)) => {
                x.ty == y.ty
                    && x.fields.len() == y.fields.len()
                    && x.fields.iter().all(|(member, vx)| {
                        y.fields
                            .get(member)
                            .is_some_and(|vy| values_eq(vx, vy, seen))
                    })
            }
            _ => false,
        },
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_eq(self, other, &mut Vec::new())
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        let mut seen = Vec::new();
        self.len() == other.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((ka, va), (kb, vb))| values_eq(ka, kb, &mut seen) && values_eq(va, vb, &mut seen))
    }
}

/// Debug adapter that prints `<cycle>` instead of revisiting a container on the path.
struct Guarded<'a> {
    value: &'a Value,
    path: &'a RefCell<Vec<usize>>,
}

impl Guarded<'_> {
    fn child<'b>(&'b self, value: &'b Value) -> Guarded<'b> {
        Guarded {
            value,
            path: self.path,
        }
    }
}

impl fmt::Debug for Guarded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.value.identity();
        if let Some(id) = id {
            if self.path.borrow().contains(&id) {
                return f.write_str("<cycle>");
            }
            self.path.borrow_mut().push(id);
        }
        let result = match self.value {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({b:?})"),
            Value::Enum(e) => write!(f, "Enum({}::{})", e.ty, e.variant),
            Value::Custom(c) => write!(f, "Custom({c:?})"),
            Value::Seq(s) => match s.try_borrow() {
                Ok(items) => f
                    .debug_list()
                    .entries(items.iter().map(|v| self.child(v)))
                    .finish(),
                Err(_) => f.write_str("<borrowed>"),
            },
            Value::Array(items) => {
                f.write_str("Array")?;
                f.debug_list()
                    .entries(items.iter().map(|v| self.child(v)))
                    .finish()
            }
            Value::Map(m) => match m.try_borrow() {
                Ok(m) => f
                    .debug_map()
                    .entries(m.iter().map(|(k, v)| (self.child(k), self.child(v))))
                    .finish(),
                Err(_) => f.write_str("<borrowed>"),
            },
            Value::Object(o) => match o.try_borrow() {
                Ok(o) => {
                    let mut s = f.debug_struct(&o.ty);
                    for (member, v) in &o.fields {
                        s.field(member, &self.child(v));
                    }
                    s.finish()
                }
                Err(_) => f.write_str("<borrowed>"),
            },
        };
        if id.is_some() {
            self.path.borrow_mut().pop();
        }
        result
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = RefCell::new(Vec::new());
        Guarded { value: self, path: &path }.fmt(f)
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.ty);
        for (member, v) in &self.fields {
            s.field(member, v);
        }
        s.finish()
    }
}
