use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::dto::{normalize_all, GraphDto, RawTraceRecord};
use crate::application::BuildFlowUsecase;
use crate::domain::graph::GraphBuilder;
use crate::error::TraceflowError;
use crate::infrastructure::{GraphCache, JsonFileTraceSource};

/// Longest request line accepted before the connection is dropped.
pub const MAX_REQUEST_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadParams {
    path: PathBuf,
    correlation_id: String,
}

/// State shared by every connection.
pub struct ServerState {
    pub builder: GraphBuilder,
    pub cache: GraphCache,
}

pub fn start_server(port: u16, state: ServerState) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!(%address, "API server listening");

    let state = Arc::new(state);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &state) {
                        tracing::warn!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "accept error"),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        match read_request(&mut reader, &mut line, MAX_REQUEST_BYTES)? {
            RequestLine::Eof => break,
            RequestLine::TooLong => {
                tracing::warn!(limit = MAX_REQUEST_BYTES, "request line too long, closing connection");
                let response = json!({
                    "status": "error",
                    "message": format!("Request exceeds {} bytes", MAX_REQUEST_BYTES)
                });
                stream.write_all(serde_json::to_string(&response)?.as_bytes())?;
                stream.write_all(b"\n")?;
                stream.flush()?;
                break;
            }
            RequestLine::Line => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(trimmed, state) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": format!("{:#}", e)
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum RequestLine {
    Line,
    Eof,
    TooLong,
}

/// Read one newline-terminated request into `line`, reading at most `limit` bytes.
fn read_request<R: BufRead>(reader: &mut R, line: &mut String, limit: u64) -> io::Result<RequestLine> {
    line.clear();
    let bytes_read = reader.by_ref().take(limit).read_line(line)?;
    if bytes_read == 0 {
        Ok(RequestLine::Eof)
    } else if bytes_read as u64 == limit && !line.ends_with('\n') {
        Ok(RequestLine::TooLong)
    } else {
        Ok(RequestLine::Line)
    }
}

/// Cache key of one correlation group in one trace file.
fn load_cache_key(path: &Path, correlation_id: &str) -> String {
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("{}#{}", path.display(), correlation_id)
}

/// Execute one JSON command line and return the `data` payload.
pub fn process_command(line: &str, state: &ServerState) -> Result<Value> {
    let req: CommandReq = serde_json::from_str(line).context("Invalid JSON command")?;
    tracing::debug!(command = %req.command, "processing command");

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "BUILD_GRAPH" => {
            let params = req.params.ok_or(TraceflowError::MissingParam("records"))?;
            let raw: Vec<RawTraceRecord> = serde_json::from_value(
                params
                    .get("records")
                    .cloned()
                    .ok_or(TraceflowError::MissingParam("records"))?,
            )
            .context("Invalid records")?;
            let graph = state.builder.build(&normalize_all(&raw));
            Ok(serde_json::to_value(GraphDto::from(&graph))?)
        }
        "LOAD" => {
            let params: LoadParams = serde_json::from_value(
                req.params.ok_or(TraceflowError::MissingParam("path"))?,
            )
            .context("Invalid LOAD params")?;
            if !params.path.exists() {
                anyhow::bail!("Trace file not found: {}", params.path.display());
            }
            let source = JsonFileTraceSource::open(&params.path)?;
            let usecase = BuildFlowUsecase {
                source: &source,
                exporter: &crate::infrastructure::JsonExporter,
                cache: Some(&state.cache),
                cache_key: Some(load_cache_key(&params.path, &params.correlation_id)),
                builder: state.builder,
            };
            let graph = usecase.graph(&params.correlation_id)?;
            Ok(serde_json::to_value(GraphDto::from(graph.as_ref()))?)
        }
        "INVALIDATE" => {
            let params: LoadParams = serde_json::from_value(
                req.params.ok_or(TraceflowError::MissingParam("path"))?,
            )
            .context("Invalid INVALIDATE params")?;
            let key = load_cache_key(&params.path, &params.correlation_id);
            Ok(json!(state.cache.invalidate(&key)))
        }
        other => Err(TraceflowError::UnknownCommand(other.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ServerState {
        ServerState {
            builder: GraphBuilder::default(),
            cache: GraphCache::new(8),
        }
    }

    #[test]
    fn test_ping() {
        let data = process_command(r#"{"command": "PING"}"#, &state()).unwrap();
        assert_eq!(data, json!("PONG"));
    }

    #[test]
    fn test_build_graph_command() {
        let line = r#"{"command": "BUILD_GRAPH", "params": {"records": [
            {"id": "root", "typeName": "Foo.Root", "message": "Create", "depth": 0, "timestamp": 0},
            {"id": "child", "typeName": "Foo.Child", "message": "Create", "depth": 1, "timestamp": 0}
        ]}}"#;
        let data = process_command(line, &state()).unwrap();
        assert_eq!(data["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(data["edges"][0]["sourceId"], "root");
        assert_eq!(data["edges"][0]["kind"], "ParentChild");
    }

    #[test]
    fn test_unknown_command_and_missing_params() {
        let err = process_command(r#"{"command": "FLY"}"#, &state()).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));

        let err = process_command(r#"{"command": "BUILD_GRAPH"}"#, &state()).unwrap_err();
        assert!(err.to_string().contains("records"));
    }

    #[test]
    fn test_load_caches_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "correlationId": "c1", "typeName": "Foo", "depth": 0, "timestamp": 0}]"#,
        )
        .unwrap();

        let state = state();
        let line = json!({
            "command": "LOAD",
            "params": {"path": &path, "correlationId": "c1"}
        })
        .to_string();
        let data = process_command(&line, &state).unwrap();
        assert_eq!(data["nodes"][0]["id"], "a");
        assert_eq!(state.cache.len(), 1);

        let invalidate = json!({
            "command": "INVALIDATE",
            "params": {"path": path, "correlationId": "c1"}
        })
        .to_string();
        assert_eq!(process_command(&invalidate, &state).unwrap(), json!(true));
        assert!(state.cache.is_empty());
    }

    #[test]
    fn test_load_keeps_files_with_same_correlation_apart() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(
            &first,
            r#"[{"id": "from-a", "correlationId": "c1", "typeName": "Foo", "depth": 0, "timestamp": 0}]"#,
        )
        .unwrap();
        std::fs::write(
            &second,
            r#"[{"id": "from-b", "correlationId": "c1", "typeName": "Foo", "depth": 0, "timestamp": 0}]"#,
        )
        .unwrap();

        let state = state();
        let load = |path: &PathBuf| {
            let line = json!({
                "command": "LOAD",
                "params": {"path": path, "correlationId": "c1"}
            })
            .to_string();
            process_command(&line, &state).unwrap()
        };

        assert_eq!(load(&first)["nodes"][0]["id"], "from-a");
        assert_eq!(load(&second)["nodes"][0]["id"], "from-b");
        assert_eq!(load(&first)["nodes"][0]["id"], "from-a");
        assert_eq!(state.cache.len(), 2);
    }

    #[test]
    fn test_read_request_bounds_line_length() {
        let mut line = String::new();

        let mut reader = io::Cursor::new(b"{\"command\": \"PING\"}\n".to_vec());
        assert_eq!(read_request(&mut reader, &mut line, 64).unwrap(), RequestLine::Line);
        assert_eq!(line.trim(), r#"{"command": "PING"}"#);
        assert_eq!(read_request(&mut reader, &mut line, 64).unwrap(), RequestLine::Eof);

        let mut oversized = io::Cursor::new(vec![b'x'; 100]);
        assert_eq!(read_request(&mut oversized, &mut line, 64).unwrap(), RequestLine::TooLong);
        assert_eq!(line.len(), 64);
    }
}
