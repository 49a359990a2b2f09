//! C1: the AST-based indexer.
//!
//! Parses source files with `tree-sitter`, walks the tree for function and
//! class definitions, and upserts a [`Chunk`] per definition into an in-memory
//! [`Index`]. Grounded on `original_source/src/indexer.py` (the captured node
//! kinds and the per-parameter classification) and on
//! `examples/DevsHero-NeuroSiphon/src/inspector.rs` (the `tree-sitter`
//! `Query`/`QueryCursor`/`StreamingIterator` idiom this crate's teacher has no
//! equivalent of — the teacher's own chunker is regex-based, see
//! `DESIGN.md`).

use crate::chunk::{Chunk, ChunkValue, Index, Signature};
use crate::error::IndexError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

const FUNCTION_QUERY: &str = "(function_definition name: (identifier) @name) @def";
const CLASS_QUERY: &str = "(class_definition name: (identifier) @name) @def";

/// Directory names skipped by [`Indexer::index_directory`].
const SKIPPED_DIRS: &[&str] = &["venv", ".venv", "__pycache__", ".git", "node_modules"];

/// Parses Python source and extracts function/class definitions into an
/// [`Index`]. Holds the loaded grammar so it is only set up once per process,
/// matching the spec's "grammar unavailable is fatal at init" contract.
pub struct Indexer {
    parser: Parser,
    language: Language,
}

impl Indexer {
    /// Loads the target grammar. Fatal on failure: callers should treat an
    /// `Err` here as refusing all further indexing.
    pub fn new() -> Result<Self, IndexError> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| IndexError::GrammarUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self { parser, language })
    }

    /// Parses one file, upserting every captured definition into `index`.
    /// Returns the mapping of `func_name -> source_text` produced by this
    /// call (not the whole index).
    pub fn parse_file(
        &mut self,
        path: &Path,
        index: &mut Index,
    ) -> Result<HashMap<String, String>, IndexError> {
        let display_path = path.display().to_string();
        let source_text = std::fs::read_to_string(path).map_err(|source| {
            IndexError::FileUnreadable {
                path: display_path.clone(),
                source,
            }
        })?;

        let tree = self
            .parser
            .parse(&source_text, None)
            .ok_or_else(|| IndexError::ParseFailed {
                path: display_path.clone(),
                reason: "tree-sitter produced no parse tree".to_string(),
            })?;

        let source = source_text.as_bytes();
        let filename = path
            .file_stem()
            .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().to_string());

        let mut defs = run_def_query(source, tree.root_node(), &self.language, FUNCTION_QUERY)
            .map_err(|reason| IndexError::ParseFailed {
                path: display_path.clone(),
                reason,
            })?;
        defs.extend(
            run_def_query(source, tree.root_node(), &self.language, CLASS_QUERY).map_err(
                |reason| IndexError::ParseFailed {
                    path: display_path.clone(),
                    reason,
                },
            )?,
        );

        let mut extracted = HashMap::new();
        for def in defs {
            let Ok(def_source) = def.def_node.utf8_text(source) else {
                continue;
            };
            let params = extract_params(def.def_node, source);
            let chunk = Chunk::new(
                def.name.clone(),
                filename.clone(),
                def_source,
                Signature {
                    params,
                    returns: None,
                },
            );
            extracted.insert(def.name.clone(), def_source.to_string());
            index.insert(def.name, chunk);
        }

        Ok(extracted)
    }

    /// Walks `root` recursively, indexing every `.py` file found, skipping
    /// build/VCS directories (see [`SKIPPED_DIRS`]). Unreadable or
    /// unparseable files are logged and skipped rather than aborting the
    /// walk, per the indexer's per-file recoverable-error policy.
    pub fn index_directory(&mut self, root: &Path, index: &mut Index) -> Result<(), IndexError> {
        for path in walk_python_files(root) {
            match self.parse_file(&path, index) {
                Ok(_) => {}
                Err(IndexError::FileUnreadable { path, source }) => {
                    warn!(%path, %source, "skipping unreadable file");
                }
                Err(IndexError::ParseFailed { path, reason }) => {
                    warn!(%path, %reason, "skipping unparseable file");
                }
                Err(err @ IndexError::GrammarUnavailable { .. }) => return Err(err),
                Err(err @ IndexError::ExportFailed { .. }) => return Err(err),
            }
        }
        Ok(())
    }

    /// Serializes `index` to `path` as pretty-printed JSON, returning the
    /// path written. Matches `original_source/src/indexer.py`'s
    /// `export_index(output_path) -> str` contract (`spec.md` §4.1): a
    /// method on the indexer, not a free function, returning the written
    /// path rather than `()`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ExportFailed`] if the index cannot be
    /// serialized or the file cannot be written.
    pub fn export_index(&self, index: &Index, path: &Path) -> Result<PathBuf, IndexError> {
        let values: HashMap<&str, ChunkValue> = index
            .iter()
            .map(|(name, chunk)| {
                (
                    name.as_str(),
                    ChunkValue {
                        source: chunk.source.clone(),
                        filename: chunk.filename.clone(),
                        signature: chunk.signature.clone(),
                    },
                )
            })
            .collect();

        let json = serde_json::to_string_pretty(&values).map_err(|e| IndexError::ExportFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| IndexError::ExportFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(path.to_path_buf())
    }
}

fn walk_python_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() {
                if !SKIPPED_DIRS.contains(&name.as_ref()) && !name.starts_with('.') {
                    stack.push(path);
                }
            } else if path.extension().is_some_and(|ext| ext == "py") {
                out.push(path);
            }
        }
    }
    out
}

struct Definition<'a> {
    name: String,
    def_node: Node<'a>,
}

fn run_def_query<'a>(
    source: &[u8],
    root: Node<'a>,
    language: &Language,
    query_src: &str,
) -> Result<Vec<Definition<'a>>, String> {
    let query = Query::new(language, query_src)
        .map_err(|e| format!("failed to compile tree-sitter query: {e}"))?;
    let mut cursor = QueryCursor::new();
    let mut out = Vec::new();

    let mut matches = cursor.matches(&query, root, source);
    while let Some(m) = matches.next() {
        let mut name_node: Option<Node> = None;
        let mut def_node: Option<Node> = None;
        for cap in m.captures {
            match query.capture_names()[cap.index as usize] {
                "name" => name_node = Some(cap.node),
                "def" => def_node = Some(cap.node),
                _ => {}
            }
        }
        let Some(name_node) = name_node else { continue };
        let def_node = def_node.unwrap_or(name_node);
        let Ok(name) = name_node.utf8_text(source) else {
            continue;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        out.push(Definition { name, def_node });
    }
    Ok(out)
}

/// Classifies each child of the `parameters` field as a plain identifier,
/// typed parameter, or default parameter, and takes its name. Drops a leading
/// `self`, matching the implicit-receiver convention for methods.
fn extract_params(def_node: Node, source: &[u8]) -> Vec<String> {
    let Some(params_node) = def_node.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut cursor = params_node.walk();
    let mut params = Vec::new();
    for child in params_node.named_children(&mut cursor) {
        let ident = match child.kind() {
            "identifier" => Some(child),
            "typed_parameter" | "default_parameter" | "typed_default_parameter" => child
                .child_by_field_name("name")
                .or_else(|| child.named_child(0)),
            _ => None,
        };
        if let Some(ident_node) = ident
            && let Ok(text) = ident_node.utf8_text(source)
        {
            params.push(text.to_string());
        }
    }

    if params.first().map(String::as_str) == Some("self") {
        params.remove(0);
    }
    params
}
