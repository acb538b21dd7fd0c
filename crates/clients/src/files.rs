use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use switchboard_core::agents::{FileAnalysis, FileKind, FileMetadata, FileStats, SearchMatch};
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, FileAgent};

const MAX_SEARCH_MATCHES: usize = 50;
const MAX_LINE_CHARS: usize = 160;

#[derive(Clone, Debug)]
struct StoredFile {
    name: String,
    content: String,
    uploaded_at: DateTime<Utc>,
}

/// In-memory file store partitioned by owner. Each user only ever reads
/// the files they uploaded.
#[derive(Default)]
pub struct InMemoryFileStore {
    files: DashMap<String, Vec<StoredFile>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a file for `owner`, replacing any earlier upload with the same name.
    pub fn add(&self, owner: &str, name: impl Into<String>, content: impl Into<String>) {
        let file =
            StoredFile { name: name.into(), content: content.into(), uploaded_at: Utc::now() };
        let mut owned = self.files.entry(owner.to_string()).or_default();
        owned.retain(|existing| existing.name != file.name);
        owned.push(file);
    }

    fn snapshot(&self, owner: &str) -> Vec<StoredFile> {
        self.files.get(owner).map(|owned| owned.value().clone()).unwrap_or_default()
    }
}

impl AgentClient for InMemoryFileStore {
    fn kind(&self) -> AgentKind {
        AgentKind::File
    }

    fn missing_settings(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl FileAgent for InMemoryFileStore {
    async fn list(&self, owner: &str) -> AgentResult<Vec<FileMetadata>> {
        let mut listed: Vec<FileMetadata> = self
            .snapshot(owner)
            .into_iter()
            .map(|file| FileMetadata {
                kind: FileKind::from_name(&file.name),
                size_bytes: file.content.len(),
                uploaded_at: file.uploaded_at,
                name: file.name,
            })
            .collect();
        listed.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(listed)
    }

    async fn analyze(&self, owner: &str, files: &[String]) -> AgentResult<FileAnalysis> {
        let owned = self.snapshot(owner);
        if owned.is_empty() {
            let analysis =
                FileAnalysis { files: Vec::new(), insights: Vec::new(), missing: Vec::new() };
            return Ok(analysis);
        }

        let (selected, missing): (Vec<&StoredFile>, Vec<String>) = if files.is_empty() {
            (owned.iter().collect(), Vec::new())
        } else {
            let mut selected = Vec::new();
            let mut missing = Vec::new();
            for requested in files {
                match owned.iter().find(|file| file.name.eq_ignore_ascii_case(requested)) {
                    Some(file) => selected.push(file),
                    None => missing.push(requested.clone()),
                }
            }
            (selected, missing)
        };

        let stats: Vec<FileStats> = selected.into_iter().map(file_stats).collect();
        let insights = insights_for(&stats);
        Ok(FileAnalysis { files: stats, insights, missing })
    }

    async fn search(&self, owner: &str, query: &str) -> AgentResult<Vec<SearchMatch>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AgentError::InvalidRequest {
                agent: AgentKind::File,
                message: "the search query is empty".to_string(),
            });
        }

        let mut owned = self.snapshot(owner);
        owned.sort_by(|left, right| left.name.cmp(&right.name));

        Ok(owned
            .iter()
            .flat_map(|file| {
                file.content.lines().enumerate().filter_map(|(index, line)| {
                    line.to_lowercase().contains(&needle).then(|| SearchMatch {
                        file: file.name.clone(),
                        line_number: index + 1,
                        line: truncate_line(line.trim()),
                    })
                })
            })
            .take(MAX_SEARCH_MATCHES)
            .collect())
    }
}

fn file_stats(file: &StoredFile) -> FileStats {
    let kind = FileKind::from_name(&file.name);
    let (csv_columns, csv_rows) = if kind == FileKind::Csv {
        let delimiter = if file.name.to_ascii_lowercase().ends_with(".tsv") { '\t' } else { ',' };
        let mut rows = file.content.lines().filter(|line| !line.trim().is_empty());
        let columns = rows.next().map(|header| header.split(delimiter).count());
        (columns, Some(rows.count()))
    } else {
        (None, None)
    };

    FileStats {
        name: file.name.clone(),
        kind,
        size_bytes: file.content.len(),
        lines: file.content.lines().count(),
        words: file.content.split_whitespace().count(),
        characters: file.content.chars().count(),
        csv_columns,
        csv_rows,
    }
}

fn insights_for(stats: &[FileStats]) -> Vec<String> {
    if stats.is_empty() {
        return Vec::new();
    }

    let total_bytes: usize = stats.iter().map(|file| file.size_bytes).sum();
    let total_lines: usize = stats.iter().map(|file| file.lines).sum();
    let mut insights = vec![format!(
        "{} file(s), {total_bytes} bytes and {total_lines} lines in total",
        stats.len()
    )];

    if let Some(largest) = stats.iter().max_by_key(|file| file.size_bytes) {
        if stats.len() > 1 {
            let (name, size) = (&largest.name, largest.size_bytes);
            insights.push(format!("largest file is {name} ({size} bytes)"));
        }
    }

    let mut kinds: HashMap<FileKind, usize> = HashMap::new();
    for file in stats {
        *kinds.entry(file.kind).or_default() += 1;
    }
    let dominant = kinds.into_iter().max_by(|(left_kind, left_count), (right_kind, right_count)| {
        left_count.cmp(right_count).then(right_kind.as_str().cmp(left_kind.as_str()))
    });
    if let Some((kind, count)) = dominant {
        insights.push(format!("dominant kind is {} ({count} file(s))", kind.as_str()));
    }

    for file in stats {
        if let (Some(columns), Some(rows)) = (file.csv_columns, file.csv_rows) {
            insights.push(format!("{} has {columns} column(s) and {rows} data row(s)", file.name));
        }
        if file.size_bytes == 0 {
            insights.push(format!("{} is empty", file.name));
        }
    }

    insights
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(MAX_LINE_CHARS).collect();
    truncated.push('…');
    truncated
}
