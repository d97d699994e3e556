use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

use super::env::expand_env_vars;

/// Servers keyed by name, in insertion order.
pub type ServerMap = IndexMap<String, McpServer>;

/// A server launched as a local process speaking MCP over stdin/stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioServer {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// A server reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServer {
    pub name: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// One MCP server definition, independent of any tool's file format.
///
/// Values are never edited in place: the builder methods consume `self` and
/// return a new server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpServer {
    Stdio(StdioServer),
    Http(HttpServer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Stdio,
    Http,
}

impl ServerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerKind::Stdio => "stdio",
            ServerKind::Http => "http",
        }
    }
}

impl McpServer {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        McpServer::Stdio(StdioServer {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        })
    }

    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        McpServer::Http(HttpServer {
            name: name.into(),
            url: url.into(),
            headers: BTreeMap::new(),
        })
    }

    /// Replace the argument list. No effect on HTTP servers.
    pub fn with_args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            McpServer::Stdio(s) => McpServer::Stdio(StdioServer {
                args: args.into_iter().map(Into::into).collect(),
                ..s
            }),
            other => other,
        }
    }

    /// Add environment variables. No effect on HTTP servers.
    pub fn with_env<I, K, V>(self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match self {
            McpServer::Stdio(mut s) => {
                s.env
                    .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
                McpServer::Stdio(s)
            }
            other => other,
        }
    }

    /// Add request headers. No effect on stdio servers.
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match self {
            McpServer::Http(mut h) => {
                h.headers
                    .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
                McpServer::Http(h)
            }
            other => other,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        match self {
            McpServer::Stdio(s) => McpServer::Stdio(StdioServer { name, ..s }),
            McpServer::Http(h) => McpServer::Http(HttpServer { name, ..h }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            McpServer::Stdio(s) => &s.name,
            McpServer::Http(h) => &h.name,
        }
    }

    pub fn kind(&self) -> ServerKind {
        match self {
            McpServer::Stdio(_) => ServerKind::Stdio,
            McpServer::Http(_) => ServerKind::Http,
        }
    }

    pub fn is_stdio(&self) -> bool {
        matches!(self, McpServer::Stdio(_))
    }

    /// A copy with every `${VAR}` placeholder expanded from the process
    /// environment.
    pub fn expanded(&self) -> Self {
        match self {
            McpServer::Stdio(s) => McpServer::Stdio(StdioServer {
                name: s.name.clone(),
                command: expand_env_vars(&s.command),
                args: s.args.iter().map(|a| expand_env_vars(a)).collect(),
                env: s
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), expand_env_vars(v)))
                    .collect(),
            }),
            McpServer::Http(h) => McpServer::Http(HttpServer {
                name: h.name.clone(),
                url: expand_env_vars(&h.url),
                headers: h
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), expand_env_vars(v)))
                    .collect(),
            }),
        }
    }

    /// Parse a server record as written in JSON config files.
    ///
    /// A missing `type` means stdio. Numbers and booleans inside `args`,
    /// `env` and `headers` are accepted and stored as strings.
    pub fn from_json_spec(name: &str, spec: &Value) -> Result<Self, AppError> {
        let obj = spec.as_object().ok_or_else(|| {
            AppError::McpValidation(format!("Server '{name}' must be a JSON object"))
        })?;

        let typ = match obj.get("type") {
            None | Some(Value::Null) => "stdio",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(AppError::McpValidation(format!(
                    "Server '{name}' has invalid type '{other}'. Must be 'stdio' or 'http'."
                )))
            }
        };

        match typ {
            "stdio" => {
                let command = obj
                    .get("command")
                    .and_then(Value::as_str)
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::McpValidation(format!(
                            "Server '{name}' missing required 'command' field for stdio type"
                        ))
                    })?;
                let args = match obj.get("args") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|v| scalar_to_string(v, name, "args"))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => {
                        return Err(AppError::McpValidation(format!(
                            "Server '{name}': 'args' must be an array of strings"
                        )))
                    }
                };
                Ok(McpServer::Stdio(StdioServer {
                    name: name.to_string(),
                    command: command.to_string(),
                    args,
                    env: string_map(obj.get("env"), name, "env")?,
                }))
            }
            "http" => {
                let url = obj
                    .get("url")
                    .and_then(Value::as_str)
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::McpValidation(format!(
                            "Server '{name}' missing required 'url' field for http type"
                        ))
                    })?;
                Ok(McpServer::Http(HttpServer {
                    name: name.to_string(),
                    url: url.to_string(),
                    headers: string_map(obj.get("headers"), name, "headers")?,
                }))
            }
            other => Err(AppError::McpValidation(format!(
                "Server '{name}' has invalid type '{other}'. Must be 'stdio' or 'http'."
            ))),
        }
    }

    /// Borrowed serializable view: `type` first, then the transport fields.
    /// `args` is always written; empty `env`/`headers` are omitted.
    pub(crate) fn spec_ref(&self) -> SpecRef<'_> {
        match self {
            McpServer::Stdio(s) => SpecRef::Stdio {
                command: &s.command,
                args: &s.args,
                env: &s.env,
            },
            McpServer::Http(h) => SpecRef::Http {
                url: &h.url,
                headers: &h.headers,
            },
        }
    }

    /// The record as a JSON value, including `type`.
    pub fn to_json_spec(&self) -> Result<Value, AppError> {
        serde_json::to_value(self.spec_ref()).map_err(|e| AppError::JsonSerialize { source: e })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum SpecRef<'a> {
    Stdio {
        command: &'a str,
        args: &'a [String],
        #[serde(skip_serializing_if = "is_empty_map")]
        env: &'a BTreeMap<String, String>,
    },
    Http {
        url: &'a str,
        #[serde(skip_serializing_if = "is_empty_map")]
        headers: &'a BTreeMap<String, String>,
    },
}

fn is_empty_map(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

fn scalar_to_string(value: &Value, name: &str, field: &str) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(AppError::McpValidation(format!(
            "Server '{name}': '{field}' values must be strings"
        ))),
    }
}

fn string_map(
    value: Option<&Value>,
    name: &str,
    field: &str,
) -> Result<BTreeMap<String, String>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), scalar_to_string(v, name, field)?)))
            .collect(),
        Some(_) => Err(AppError::McpValidation(format!(
            "Server '{name}': '{field}' must be an object"
        ))),
    }
}

/// Decode a map of server records, skipping entries that fail to parse.
pub fn servers_from_json_map(map: &Map<String, Value>, source: &str) -> ServerMap {
    let mut servers = ServerMap::new();
    for (name, spec) in map {
        match McpServer::from_json_spec(name, spec) {
            Ok(server) => {
                servers.insert(name.clone(), server);
            }
            Err(e) => log::warn!("Skipping MCP server '{name}' in {source}: {e}"),
        }
    }
    servers
}
