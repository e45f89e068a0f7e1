//! In-memory stand-in for one platform collection.
//!
//! Mounted on a wiremock server, a [`MockCollection`] serves create, read,
//! patch, put, delete and list calls against a shared store so tests can
//! observe real round trips instead of canned responses.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Map, Value};
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CREATED_AT: &str = "2024-06-01T12:00:00Z";

#[derive(Default)]
struct Store {
    objects: BTreeMap<String, Map<String, Value>>,
    next_id: u64,
}

/// Stateful collection behind `base_path`, e.g. `/api/v1/admin/groups`.
#[derive(Clone)]
pub struct MockCollection {
    base_path: String,
    items_key: &'static str,
    unique_field: &'static str,
    defaults: Map<String, Value>,
    store: Arc<Mutex<Store>>,
}

impl MockCollection {
    pub fn new(base_path: &str, items_key: &'static str, unique_field: &'static str) -> Self {
        let mut defaults = Map::new();
        defaults.insert("created_at".to_string(), json!(CREATED_AT));
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            items_key,
            unique_field,
            defaults,
            store: Arc::new(Mutex::new(Store::default())),
        }
    }

    /// Field the platform fills in on create when the request omits it.
    pub fn with_default(mut self, field: &str, value: Value) -> Self {
        self.defaults.insert(field.to_string(), value);
        self
    }

    pub async fn mount(&self, server: &MockServer) {
        let pattern = format!("^{}(/[^/]+)?$", regex_escape(&self.base_path));
        Mock::given(path_regex(pattern))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    /// Insert an object directly, bypassing the API.
    pub fn seed(&self, attributes: Value) -> String {
        let mut store = self.lock();
        store.next_id += 1;
        let id = format!("obj-{}", store.next_id);
        let Value::Object(mut object) = attributes else {
            panic!("seed expects a JSON object");
        };
        for (k, v) in &self.defaults {
            object.entry(k.clone()).or_insert_with(|| v.clone());
        }
        store.objects.insert(id.clone(), object);
        id
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.lock().objects.get(id).map(|o| with_id(id, o))
    }

    pub fn remove(&self, id: &str) {
        self.lock().objects.remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    fn create(&self, body: Value) -> ResponseTemplate {
        let Value::Object(mut object) = body else {
            return error(400, "INVALID_INPUT", "body must be an object");
        };
        let mut store = self.lock();
        if let Some(wanted) = object.get(self.unique_field) {
            if store
                .objects
                .values()
                .any(|o| o.get(self.unique_field) == Some(wanted))
            {
                return error(409, "ALREADY_EXISTS", "an object with that name exists");
            }
        }
        for (k, v) in &self.defaults {
            object.entry(k.clone()).or_insert_with(|| v.clone());
        }
        store.next_id += 1;
        let id = format!("obj-{}", store.next_id);
        let response = with_id(&id, &object);
        store.objects.insert(id, object);
        ResponseTemplate::new(201).set_body_json(response)
    }

    fn read(&self, id: &str) -> ResponseTemplate {
        match self.get(id) {
            Some(object) => ResponseTemplate::new(200).set_body_json(object),
            None => not_found(id),
        }
    }

    fn patch(&self, id: &str, body: Value) -> ResponseTemplate {
        let Value::Object(changes) = body else {
            return error(400, "INVALID_INPUT", "body must be an object");
        };
        let mut store = self.lock();
        let Some(object) = store.objects.get_mut(id) else {
            return not_found(id);
        };
        object.extend(changes);
        ResponseTemplate::new(200).set_body_json(with_id(id, object))
    }

    fn put(&self, id: &str, body: Value) -> ResponseTemplate {
        let Value::Object(mut replacement) = body else {
            return error(400, "INVALID_INPUT", "body must be an object");
        };
        let mut store = self.lock();
        let Some(object) = store.objects.get_mut(id) else {
            return not_found(id);
        };
        for k in self.defaults.keys() {
            if let Some(v) = object.get(k) {
                replacement.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        *object = replacement;
        ResponseTemplate::new(200).set_body_json(with_id(id, object))
    }

    fn delete(&self, id: &str) -> ResponseTemplate {
        match self.lock().objects.remove(id) {
            Some(_) => ResponseTemplate::new(204),
            None => not_found(id),
        }
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let params: BTreeMap<String, String> = request.url.query_pairs().into_owned().collect();
        let limit = params
            .get("limit")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(100);
        let skip = params
            .get("skip")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut filters = Vec::new();
        for i in 0.. {
            let Some(field) = params.get(&format!("filter[{i}].field")) else {
                break;
            };
            let operator = params
                .get(&format!("filter[{i}].operator"))
                .cloned()
                .unwrap_or_else(|| "eq".to_string());
            let value = params
                .get(&format!("filter[{i}].value"))
                .cloned()
                .unwrap_or_default();
            filters.push((field.clone(), operator, value));
        }

        let store = self.lock();
        let mut matching: Vec<Value> = store
            .objects
            .iter()
            .filter(|(_, o)| {
                filters
                    .iter()
                    .all(|(f, op, v)| filter_matches(o.get(f), op, v))
            })
            .map(|(id, o)| with_id(id, o))
            .collect();

        if let Some(field) = params.get("sort") {
            matching.sort_by(|a, b| {
                let a = a.get(field).map(Value::to_string).unwrap_or_default();
                let b = b.get(field).map(Value::to_string).unwrap_or_default();
                a.cmp(&b)
            });
            if params.get("sortDirection").map(String::as_str) == Some("desc") {
                matching.reverse();
            }
        }

        let total = matching.len();
        let page: Vec<Value> = matching.into_iter().skip(skip).take(limit).collect();
        let mut envelope = Map::new();
        envelope.insert(self.items_key.to_string(), Value::Array(page));
        envelope.insert("total".to_string(), json!(total));
        ResponseTemplate::new(200).set_body_json(Value::Object(envelope))
    }
}

impl Respond for MockCollection {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();
        let member = path
            .strip_prefix(&self.base_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|id| !id.is_empty());
        let body = || serde_json::from_slice::<Value>(&request.body).unwrap_or(Value::Null);

        match (request.method.as_str(), member) {
            ("POST", None) => self.create(body()),
            ("GET", None) => self.list(request),
            ("GET", Some(id)) => self.read(id),
            ("PATCH", Some(id)) => self.patch(id, body()),
            ("PUT", Some(id)) => self.put(id, body()),
            ("DELETE", Some(id)) => self.delete(id),
            _ => error(405, "INVALID_INPUT", "method not allowed"),
        }
    }
}

fn filter_matches(actual: Option<&Value>, operator: &str, expected: &str) -> bool {
    let actual = match actual {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return false,
    };
    match operator {
        "eq" => actual == expected,
        "ne" => actual != expected,
        "contains" => actual.contains(expected),
        "startsWith" => actual.starts_with(expected),
        _ => false,
    }
}

fn with_id(id: &str, object: &Map<String, Value>) -> Value {
    let mut out = object.clone();
    out.insert("id".to_string(), json!(id));
    Value::Object(out)
}

fn error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"code": code, "message": message}))
}

fn not_found(id: &str) -> ResponseTemplate {
    error(404, "NOT_FOUND", &format!("object {id} not found"))
}

fn regex_escape(raw: &str) -> String {
    raw.chars()
        .flat_map(|c| {
            let escape = matches!(c, '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}');
            escape.then_some('\\').into_iter().chain(std::iter::once(c))
        })
        .collect()
}
