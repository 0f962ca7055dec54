//! Declared type references and their coarse classification

use serde::{Deserialize, Serialize};

/// Coarse classification of a declared type, enough for the detectors to
/// tell "may return null" types from value types and collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Void,
    Primitive,
    /// `boolean` or `Boolean`
    Boolean,
    /// Collections, maps, streams and arrays
    Container,
    /// `Optional` and its primitive specialisations
    OptionalLike,
    Reference,
}

const PRIMITIVES: &[&str] = &["byte", "short", "int", "long", "float", "double", "char"];

const CONTAINERS: &[&str] = &[
    "List",
    "ArrayList",
    "LinkedList",
    "CopyOnWriteArrayList",
    "Set",
    "HashSet",
    "LinkedHashSet",
    "TreeSet",
    "SortedSet",
    "NavigableSet",
    "EnumSet",
    "Map",
    "HashMap",
    "LinkedHashMap",
    "TreeMap",
    "SortedMap",
    "NavigableMap",
    "ConcurrentMap",
    "ConcurrentHashMap",
    "EnumMap",
    "Collection",
    "Iterable",
    "Iterator",
    "Queue",
    "Deque",
    "ArrayDeque",
    "PriorityQueue",
    "Stack",
    "Vector",
    "Stream",
    "IntStream",
    "LongStream",
    "DoubleStream",
];

const OPTIONALS: &[&str] = &["Optional", "OptionalInt", "OptionalLong", "OptionalDouble"];

/// A type as written at a declaration site
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Source text with whitespace collapsed
    pub text: String,
    pub class: TypeClass,
}

impl TypeRef {
    pub fn parse(text: &str) -> Self {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let class = classify(&text);
        Self { text, class }
    }

    /// Unqualified name without type arguments or array suffixes
    /// (`java.util.List<String>[]` -> `List`)
    pub fn base_name(&self) -> &str {
        base_name(&self.text)
    }
}

fn base_name(text: &str) -> &str {
    let head = text.trim_end_matches("...");
    let head = head
        .split(['<', '['])
        .next()
        .unwrap_or(head)
        .trim();
    // drop type annotations such as `@NonNull String`
    let head = head.rsplit(' ').next().unwrap_or(head);
    head.rsplit('.').next().unwrap_or(head)
}

fn classify(text: &str) -> TypeClass {
    if text.ends_with("[]") || text.ends_with("...") {
        return TypeClass::Container;
    }
    let base = base_name(text);
    match base {
        "void" => TypeClass::Void,
        "boolean" | "Boolean" => TypeClass::Boolean,
        b if PRIMITIVES.contains(&b) => TypeClass::Primitive,
        b if OPTIONALS.contains(&b) => TypeClass::OptionalLike,
        b if CONTAINERS.contains(&b) => TypeClass::Container,
        _ => TypeClass::Reference,
    }
}
