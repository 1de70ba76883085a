use crate::errors::Error;
use crate::types::{Element, Value};
use core::fmt;
use std::convert::Infallible;
use std::str::FromStr;

/// One step of a [`Path`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A member of an object or associative array
    Key(String),
    /// A position in a sequence
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => {
                let escaped = k.replace('~', "~0").replace('/', "~1");
                // A key that would read back as an index gets its bracket escaped
                match escaped.strip_prefix('[') {
                    Some(rest) if parse_index(k).is_some() => write!(f, "~2{}", rest),
                    _ => f.write_str(&escaped),
                }
            }
        }
    }
}

fn parse_index(s: &str) -> Option<usize> {
    s.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
}

/// Address of a value inside a tree, written as `a/b/[3]/c`
///
/// `[n]` is an index, anything else a key. Inside keys `~0` stands for `~`, `~1` for `/`
/// and a leading `~2` for `[`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The empty path, addressing the root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the text form of a path, a leading `/` is optional
    pub fn parse(s: &str) -> Self {
        let s = s.strip_prefix('/').unwrap_or(s);
        if s.is_empty() {
            return Self::root();
        }
        Path(
            s.split('/')
                .map(|part| match parse_index(part) {
                    Some(i) => PathSegment::Index(i),
                    None => PathSegment::Key(unescape(part)),
                })
                .collect(),
        )
    }

    /// The segments of this path
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// True for the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// This path extended by `key`
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut p = self.clone();
        p.push(PathSegment::Key(key.into()));
        p
    }

    /// This path extended by `index`
    pub fn index(&self, index: usize) -> Self {
        let mut p = self.clone();
        p.push(PathSegment::Index(index));
        p
    }

    /// The path without its last segment, `None` for the root
    pub fn parent(&self) -> Option<(Path, &PathSegment)> {
        let (last, rest) = self.0.split_last()?;
        Some((Path(rest.to_vec()), last))
    }

    fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    fn error(&self, depth: usize, reason: String) -> Error {
        Error::Path {
            path: self.prefix(depth + 1).to_string(),
            reason,
        }
    }
}

fn unescape(part: &str) -> String {
    let part = match part.strip_prefix("~2") {
        Some(rest) => format!("[{}", rest),
        None => part.to_string(),
    };
    part.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }
}

fn find_member<'v>(members: &'v [Element], key: &str) -> Result<&'v Value, String> {
    members
        .iter()
        .find(|e| e.name == key)
        .map(|e| &e.value)
        .ok_or_else(|| format!("no member named `{}`", key))
}

fn out_of_bounds(index: usize, len: usize) -> String {
    format!("index {} is out of bounds for length {}", index, len)
}

fn mismatch(value: &Value, segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(_) => format!("expected a map but found {}", value.kind()),
        PathSegment::Index(_) => format!("expected a sequence but found {}", value.kind()),
    }
}

fn child<'v>(value: &'v Value, segment: &PathSegment) -> Result<&'v Value, String> {
    match (value.unwrapped(), segment) {
        (Value::Object(members, _), PathSegment::Key(k))
        | (Value::ECMAArray(_, members, _), PathSegment::Key(k)) => find_member(members, k),
        (Value::StrictArray(items), PathSegment::Index(i))
        | (Value::ECMAArray(items, _, _), PathSegment::Index(i))
        | (Value::VectorObject(items, _, _), PathSegment::Index(i)) => {
            items.get(*i).ok_or_else(|| out_of_bounds(*i, items.len()))
        }
        (Value::Dictionary(pairs, _), PathSegment::Index(i)) => pairs
            .get(*i)
            .map(|(_, v)| v)
            .ok_or_else(|| out_of_bounds(*i, pairs.len())),
        (other, segment) => Err(mismatch(other, segment)),
    }
}

fn child_mut<'v>(value: &'v mut Value, segment: &PathSegment) -> Result<&'v mut Value, String> {
    match (value.unwrapped_mut(), segment) {
        (Value::Object(members, _), PathSegment::Key(k))
        | (Value::ECMAArray(_, members, _), PathSegment::Key(k)) => members
            .iter_mut()
            .find(|e| &e.name == k)
            .map(|e| &mut e.value)
            .ok_or_else(|| format!("no member named `{}`", k)),
        (Value::StrictArray(items), PathSegment::Index(i))
        | (Value::ECMAArray(items, _, _), PathSegment::Index(i))
        | (Value::VectorObject(items, _, _), PathSegment::Index(i)) => {
            let len = items.len();
            items.get_mut(*i).ok_or_else(|| out_of_bounds(*i, len))
        }
        (Value::Dictionary(pairs, _), PathSegment::Index(i)) => {
            let len = pairs.len();
            pairs
                .get_mut(*i)
                .map(|(_, v)| v)
                .ok_or_else(|| out_of_bounds(*i, len))
        }
        (other, segment) => Err(mismatch(other, segment)),
    }
}

/// Follow `path` from `root`
pub fn get<'v>(root: &'v Value, path: &Path) -> Result<&'v Value, Error> {
    let mut current = root;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = child(current, segment).map_err(|reason| path.error(depth, reason))?;
    }
    Ok(current)
}

/// Follow `path` from `root`, returning a mutable reference
pub fn get_mut<'v>(root: &'v mut Value, path: &Path) -> Result<&'v mut Value, Error> {
    let mut current = root;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = child_mut(current, segment).map_err(|reason| path.error(depth, reason))?;
    }
    Ok(current)
}

/// Store `value` at `path`
///
/// A missing key is appended to objects with a dynamic (or no) class and to associative arrays,
/// sealed objects only accept their declared members. Indices must already exist.
pub fn set(root: &mut Value, path: &Path, value: Value) -> Result<(), Error> {
    let Some((parent_path, last)) = path.parent() else {
        *root = value;
        return Ok(());
    };
    let depth = parent_path.segments().len();
    let parent = get_mut(root, &parent_path)?;

    if let PathSegment::Key(key) = last {
        match parent.unwrapped_mut() {
            Value::Object(members, class_def) => {
                if let Some(member) = members.iter_mut().find(|e| &e.name == key) {
                    member.value = value;
                    return Ok(());
                }
                if let Some(def) = class_def.as_ref().filter(|d| !d.is_dynamic()) {
                    return Err(path.error(
                        depth,
                        format!("class `{}` is sealed and has no member `{}`", def.name, key),
                    ));
                }
                members.push(Element::new(key.clone(), value));
                return Ok(());
            }
            Value::ECMAArray(_, members, _) => {
                match members.iter_mut().find(|e| &e.name == key) {
                    Some(member) => member.value = value,
                    None => members.push(Element::new(key.clone(), value)),
                }
                return Ok(());
            }
            _ => {}
        }
    }

    let slot = child_mut(parent, last).map_err(|reason| path.error(depth, reason))?;
    *slot = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDefinition;
    use enumset::EnumSet;
    use pretty_assertions::assert_eq;

    fn sample() -> Value {
        Value::object(vec![
            Element::new("name", "Jack"),
            Element::new(
                "tools",
                Value::StrictArray(vec![
                    Value::object(vec![Element::new("level", 3)]),
                    Value::object(vec![Element::new("level", 1)]),
                ]),
            ),
            Element::new(
                "flags",
                Value::AMF3(Box::new(Value::Dictionary(
                    vec![(Value::from("k"), Value::Bool(true))],
                    false,
                ))),
            ),
        ])
    }

    #[test]
    fn text_form() {
        let p = Path::parse("tools/[1]/level");
        assert_eq!(
            p.segments(),
            &[
                PathSegment::Key("tools".into()),
                PathSegment::Index(1),
                PathSegment::Key("level".into())
            ]
        );
        assert_eq!(p.to_string(), "tools/[1]/level");
        assert_eq!(Path::parse("/tools"), Path::parse("tools"));
        assert!(Path::parse("").is_root());
    }

    #[test]
    fn escaping() {
        let p = Path::root().key("a/b~c").key("[2]").key("[x]");
        let text = p.to_string();
        assert_eq!(text, "a~1b~0c/~22]/[x]");
        assert_eq!(Path::parse(&text), p);
    }

    #[test]
    fn get_nested() {
        let v = sample();
        assert_eq!(
            get(&v, &Path::parse("tools/[0]/level")).unwrap(),
            &Value::Integer(3)
        );
        assert_eq!(get(&v, &Path::root()).unwrap(), &v);
        assert_eq!(
            get(&v, &Path::parse("flags/[0]")).unwrap(),
            &Value::Bool(true)
        );
    }

    #[test]
    fn get_errors_name_the_failing_prefix() {
        let v = sample();
        match get(&v, &Path::parse("tools/[5]/level")) {
            Err(Error::Path { path, .. }) => assert_eq!(path, "tools/[5]"),
            other => panic!("unexpected {:?}", other),
        }
        match get(&v, &Path::parse("name/x")) {
            Err(Error::Path { path, reason }) => {
                assert_eq!(path, "name/x");
                assert!(reason.contains("String"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            get(&v, &Path::parse("tools/level")),
            Err(Error::Path { .. })
        ));
        assert!(matches!(
            get(&v, &Path::parse("missing")),
            Err(Error::Path { .. })
        ));
    }

    #[test]
    fn set_then_get() {
        let mut v = sample();
        let p = Path::parse("tools/[1]/level");
        set(&mut v, &p, Value::Integer(9)).unwrap();
        assert_eq!(get(&v, &p).unwrap(), &Value::Integer(9));
        assert_eq!(
            get(&v, &Path::parse("tools/[0]/level")).unwrap(),
            &Value::Integer(3)
        );
        assert_eq!(get(&v, &Path::parse("name")).unwrap(), &Value::from("Jack"));
    }

    #[test]
    fn set_appends_to_dynamic_objects() {
        let mut v = sample();
        set(&mut v, &Path::parse("coins"), Value::Number(5.0)).unwrap();
        match &v {
            Value::Object(members, _) => assert_eq!(members.last().unwrap().name, "coins"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn set_rejects_new_members_on_sealed_objects() {
        let def = ClassDefinition {
            name: "Point".into(),
            attributes: EnumSet::empty(),
            static_properties: vec!["x".into()],
        };
        let mut v = Value::Object(vec![Element::new("x", 1)], Some(def));
        set(&mut v, &Path::parse("x"), Value::Integer(2)).unwrap();
        assert!(matches!(
            set(&mut v, &Path::parse("y"), Value::Integer(2)),
            Err(Error::Path { .. })
        ));
    }

    #[test]
    fn set_out_of_bounds() {
        let mut v = sample();
        assert!(matches!(
            set(&mut v, &Path::parse("tools/[2]"), Value::Null),
            Err(Error::Path { .. })
        ));
    }

    #[test]
    fn set_root() {
        let mut v = sample();
        set(&mut v, &Path::root(), Value::Null).unwrap();
        assert_eq!(v, Value::Null);
    }
}
