//! Deterministic intent classification.
//!
//! The classifier is a decision table: domain rules are evaluated top to
//! bottom and the first rule whose keywords match owns the utterance. Each
//! domain then picks a sub-action from its own ordered verb list and pulls
//! parameters out of the original (case-preserved) text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use switchboard_core::{Intent, IntentKind, IntentParameters};

/// Caller-supplied context for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user: Option<String>,
    pub recent_files: Vec<String>,
}

impl RequestContext {
    pub fn for_user(user: impl Into<String>) -> Self {
        Self { user: Some(user.into()), recent_files: Vec::new() }
    }
}

const CONFIDENCE_WITH_ID: f32 = 0.95;
const CONFIDENCE_MISSING_ID: f32 = 0.6;
const CONFIDENCE_KEYWORD: f32 = 0.9;
const CONFIDENCE_FALLBACK: f32 = 0.8;
const CONFIDENCE_GENERIC: f32 = 0.3;
const CONFIDENCE_EMPTY: f32 = 0.1;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("classifier patterns are valid")
}

static WORKFLOW_TERMS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(workflows?|flux|automati[sz]ations?|n8n)\b"));
static FILE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(fichiers?|files?|documents?|uploads?)\b|\.(csv|tsv|txt|md|json|log)\b")
});
static DEPLOYMENT_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(deploy\w*|redeploy\w*|d[ée]ploi\w*|d[ée]ploy\w*|render|services?|srv-[a-z0-9]+)\b")
});
static DATABASE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(databases?|bases? de donn[ée]es|airtable|tables?|records?|enregistrements?",
        r"|tbl[a-z0-9]+)\b"
    ))
});
static EMAIL_TERMS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(e-?mails?|courriels?|mails?)\b"));
static SECURITY_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(s[ée]curit[ée]|security|audit\w*|credentials?|api keys?|cl[ée]s? api)\b")
});
static HELP_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(help|aide|aidez|commands?|commandes?|what can you do|que (?:peux|sais)-tu faire)\b")
});
static CONVERSATION_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(historique|history|conversation|reset|r[ée]initialis\w*|forget|oublie\w*)\b")
});

static DELETE_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(supprim\w*|delete\w*|remove\w*|efface\w*|retire\w*|d[ée]trui\w*|destroy\w*)\b")
});
static BULK_QUALIFIERS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(all|every|tous|tout|toutes)\b"));
static LIST_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(list|lists|listing|liste\w*|enumerate|show (?:me )?(?:all|my)",
        r"|affiche\w* (?:les|mes|tous)|montre\w* (?:les|mes|tous)|quels sont)\b"
    ))
});
static EXECUTE_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(ex[ée]cut\w*|run|runs|running|lance\w*|d[ée]clench\w*|trigger\w*|start)\b")
});
static DETAIL_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(d[ée]tails?|info\w*|describe|d[ée]cri\w*|show|affiche\w*|montre\w*)\b")
});

static SEARCH_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(search\w*|cherche\w*|recherche\w*|find|trouve\w*|grep)\b")
});
static ANALYZE_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(analy[sz]\w*|stat\w*|insights?|r[ée]sum\w*|summari[sz]\w*|examine\w*)\b")
});

static STATUS_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(status|statut|[ée]tat|progress|progression|where)\b")
});
static DEPLOY_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(deploy|redeploy|d[ée]ploie\w*|d[ée]ployer|ship|push|release)\b")
});

static RESET_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(reset|r[ée]initialis\w*|forget|oublie\w*|clear|efface\w*|vide\w*)\b")
});

static ANNOTATED_ID: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\(\s*id\s*:\s*`?([A-Za-z0-9_-]+)`?\s*\)"));
static QUOTED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"["'`«]([A-Za-z0-9_-]{3,})["'`»]"#));
static BARE_WORKFLOW_ID: LazyLock<Regex> = LazyLock::new(|| regex(r"\b([A-Za-z0-9]{16})\b"));
static SERVICE_ID: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(srv-[a-z0-9]+)\b"));
static TABLE_ID: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(tbl[A-Za-z0-9]{3,})\b"));
static NAMED_TABLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?i)\btable\s+["'`]?([A-Za-z0-9_-]+)"#));
static RECORD_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"(?i)\b(\d{1,4})\s+(?:records?|rows?|enregistrements?|lignes?)\b",
        r"|\b(?:limit|max)\s*:?\s*(\d{1,4})\b"
    ))
});
static EMAIL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})\b"));
static SUBJECT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    regex(r#"(?i)\b(?:subject|sujet|objet)\s*[:=]?\s*(?:"([^"]+)"|'([^']+)'|([^,;\n"']+))"#)
});
static CONTENT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"(?i)\b(?:content|body|message|contenu|corps|texte)\s*[:=]?\s*",
        r#"(?:"([^"]+)"|'([^']+)'|([^;\n"']+))"#
    ))
});
static QUOTED_TEXT: LazyLock<Regex> = LazyLock::new(|| regex(r#""([^"]+)"|'([^']{2,})'"#));
static QUOTED_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"["'`]([^"'`]+\.[A-Za-z0-9]{1,5})["'`]"#));
static BARE_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b([\w-]+\.(?:csv|tsv|txt|md|json|log|rs|py|js|ts|yaml|yml|toml))\b")
});
static SEARCH_TAIL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:for|pour|about|sur)\s+(.+)$"));
static SEARCH_SCOPE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\s+(?:in|dans)\s+(?:my|mes|the|les)\s+(?:files?|fichiers?|documents?)\s*[.?!]*$")
});
static HISTORY_LIMIT: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d{1,3})\b"));

/// Lowercased view for keyword matching next to the original text used for
/// parameter extraction.
struct Utterance<'a> {
    original: &'a str,
    normalized: String,
}

impl<'a> Utterance<'a> {
    fn new(original: &'a str) -> Self {
        Self { original, normalized: normalize_text(original) }
    }

    fn mentions(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.normalized)
    }
}

struct DomainRule {
    domain: &'static str,
    matches: fn(&Utterance<'_>) -> bool,
    classify: fn(&Utterance<'_>, &RequestContext) -> Intent,
}

/// Domain priority. An utterance mentioning several domains always resolves
/// to the earliest rule.
const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule { domain: "workflow", matches: mentions_workflow, classify: classify_workflow },
    DomainRule { domain: "file", matches: mentions_file, classify: classify_file },
    DomainRule {
        domain: "deployment",
        matches: mentions_deployment,
        classify: classify_deployment,
    },
    DomainRule { domain: "database", matches: mentions_database, classify: classify_database },
    DomainRule { domain: "email", matches: mentions_email, classify: classify_email },
    DomainRule { domain: "security", matches: mentions_security, classify: classify_security },
    DomainRule { domain: "help", matches: mentions_help, classify: classify_help },
    DomainRule {
        domain: "conversation",
        matches: mentions_conversation,
        classify: classify_conversation,
    },
];

fn mentions_workflow(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&WORKFLOW_TERMS)
}

fn mentions_file(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&FILE_TERMS)
}

fn mentions_deployment(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&DEPLOYMENT_TERMS)
}

fn mentions_database(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&DATABASE_TERMS)
}

fn mentions_email(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&EMAIL_TERMS)
}

fn mentions_security(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&SECURITY_TERMS)
}

fn mentions_help(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&HELP_TERMS)
}

fn mentions_conversation(utterance: &Utterance<'_>) -> bool {
    utterance.mentions(&CONVERSATION_TERMS)
}

#[derive(Clone, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Always returns an intent. Unmatched or empty input becomes a
    /// low-confidence generic conversation carrying the raw text.
    pub fn classify(&self, text: &str, context: &RequestContext) -> Intent {
        let utterance = Utterance::new(text);
        if utterance.normalized.is_empty() {
            return generic(text, CONFIDENCE_EMPTY);
        }

        DOMAIN_RULES
            .iter()
            .find(|rule| (rule.matches)(&utterance))
            .map(|rule| (rule.classify)(&utterance, context))
            .unwrap_or_else(|| generic(text, CONFIDENCE_GENERIC))
    }

    /// Name of the domain rule that owns `text`, if any.
    pub fn matched_domain(&self, text: &str) -> Option<&'static str> {
        let utterance = Utterance::new(text);
        DOMAIN_RULES.iter().find(|rule| (rule.matches)(&utterance)).map(|rule| rule.domain)
    }
}

fn generic(text: &str, confidence: f32) -> Intent {
    Intent::new(
        IntentKind::GenericConversation,
        IntentParameters { message: Some(text.to_string()), ..IntentParameters::default() },
        confidence,
    )
}

fn classify_workflow(utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    let ids = workflow_ids(&without_json_literal(utterance.original));

    if utterance.mentions(&DELETE_VERBS) {
        if utterance.mentions(&BULK_QUALIFIERS) {
            return Intent::bare(IntentKind::WorkflowDeleteAllInactive, CONFIDENCE_KEYWORD);
        }
        if ids.len() >= 2 {
            let parameters = IntentParameters { workflow_ids: ids, ..IntentParameters::default() };
            return Intent::new(IntentKind::WorkflowDeleteMultiple, parameters, CONFIDENCE_WITH_ID);
        }
        return with_workflow_id(IntentKind::WorkflowDelete, ids, None);
    }

    if utterance.mentions(&LIST_VERBS) {
        return Intent::bare(IntentKind::WorkflowList, CONFIDENCE_KEYWORD);
    }

    if utterance.mentions(&EXECUTE_VERBS) {
        let data = execution_data(utterance.original);
        return with_workflow_id(IntentKind::WorkflowExecute, ids, data);
    }

    if utterance.mentions(&DETAIL_VERBS) || !ids.is_empty() {
        return with_workflow_id(IntentKind::WorkflowDetails, ids, None);
    }

    Intent::bare(IntentKind::WorkflowStatus, CONFIDENCE_FALLBACK)
}

fn with_workflow_id(kind: IntentKind, ids: Vec<String>, execution_data: Option<Value>) -> Intent {
    let workflow_id = ids.into_iter().next();
    let confidence = if workflow_id.is_some() { CONFIDENCE_WITH_ID } else { CONFIDENCE_MISSING_ID };
    let parameters =
        IntentParameters { workflow_id, execution_data, ..IntentParameters::default() };
    Intent::new(kind, parameters, confidence)
}

fn classify_file(utterance: &Utterance<'_>, context: &RequestContext) -> Intent {
    if utterance.mentions(&SEARCH_VERBS) {
        let query = search_query(utterance.original);
        let confidence = if query.is_some() { CONFIDENCE_KEYWORD } else { CONFIDENCE_MISSING_ID };
        let parameters = IntentParameters { query, ..IntentParameters::default() };
        return Intent::new(IntentKind::FileSearch, parameters, confidence);
    }

    if utterance.mentions(&ANALYZE_VERBS) {
        let mut files = file_names(utterance.original);
        if files.is_empty() {
            files = context.recent_files.clone();
        }
        let parameters = IntentParameters { files, ..IntentParameters::default() };
        return Intent::new(IntentKind::FileAnalyze, parameters, CONFIDENCE_KEYWORD);
    }

    Intent::bare(IntentKind::FileList, CONFIDENCE_KEYWORD)
}

fn classify_deployment(utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    let service_id = service_id(utterance.original);
    let with_service = |kind: IntentKind| {
        let confidence =
            if service_id.is_some() { CONFIDENCE_WITH_ID } else { CONFIDENCE_MISSING_ID };
        let parameters =
            IntentParameters { service_id: service_id.clone(), ..IntentParameters::default() };
        Intent::new(kind, parameters, confidence)
    };

    if utterance.mentions(&STATUS_VERBS) {
        return with_service(IntentKind::DeploymentStatus);
    }
    if utterance.mentions(&LIST_VERBS) || utterance.mentions(&BULK_QUALIFIERS) {
        return Intent::bare(IntentKind::DeploymentList, CONFIDENCE_KEYWORD);
    }
    if utterance.mentions(&DEPLOY_VERBS) {
        return with_service(IntentKind::DeploymentDeploy);
    }
    if service_id.is_some() {
        return with_service(IntentKind::DeploymentStatus);
    }
    Intent::bare(IntentKind::DeploymentList, CONFIDENCE_FALLBACK)
}

fn classify_database(utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    let table_id = table_id(utterance.original);
    let confidence = if table_id.is_some() { CONFIDENCE_KEYWORD } else { CONFIDENCE_MISSING_ID };
    let parameters = IntentParameters {
        table_id,
        max_records: record_limit(utterance.original),
        ..IntentParameters::default()
    };
    Intent::new(IntentKind::DatabaseListRecords, parameters, confidence)
}

fn classify_email(utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    let original = utterance.original;
    let to = EMAIL_ADDRESS.captures(original).map(|captures| captures[1].to_string());

    let quoted: Vec<String> = QUOTED_TEXT
        .captures_iter(original)
        .filter_map(|captures| first_group(&captures, &[1, 2]))
        .collect();
    let subject = SUBJECT_FIELD
        .captures(original)
        .and_then(|captures| first_group(&captures, &[1, 2, 3]))
        .or_else(|| quoted.first().cloned());
    let content = CONTENT_FIELD
        .captures(original)
        .and_then(|captures| first_group(&captures, &[1, 2, 3]))
        .or_else(|| quoted.get(1).cloned());

    let confidence = if to.is_some() { CONFIDENCE_KEYWORD } else { CONFIDENCE_MISSING_ID };
    let parameters = IntentParameters { to, subject, content, ..IntentParameters::default() };
    Intent::new(IntentKind::EmailSend, parameters, confidence)
}

fn classify_security(_utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    Intent::bare(IntentKind::SecurityAudit, CONFIDENCE_KEYWORD)
}

fn classify_help(_utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    Intent::bare(IntentKind::Help, CONFIDENCE_KEYWORD)
}

fn classify_conversation(utterance: &Utterance<'_>, _context: &RequestContext) -> Intent {
    if utterance.mentions(&RESET_VERBS) {
        return Intent::bare(IntentKind::ConversationReset, CONFIDENCE_KEYWORD);
    }

    let history_limit = HISTORY_LIMIT
        .captures(&utterance.normalized)
        .and_then(|captures| captures[1].parse::<usize>().ok())
        .filter(|limit| *limit > 0);
    let parameters = IntentParameters { history_limit, ..IntentParameters::default() };
    Intent::new(IntentKind::ConversationHistory, parameters, CONFIDENCE_KEYWORD)
}

/// Identifier candidates from the first extraction level that matches
/// anything: `(ID: …)` annotations, then 16-character tokens, then quoted
/// tokens. Generated-looking tokens (digits or inner capitals) shadow plain
/// 16-letter words.
fn workflow_ids(text: &str) -> Vec<String> {
    let annotated =
        unique(ANNOTATED_ID.captures_iter(text).map(|captures| captures[1].to_string()));
    if !annotated.is_empty() {
        return annotated;
    }

    let (generated, plain): (Vec<String>, Vec<String>) = BARE_WORKFLOW_ID
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .partition(|token| looks_generated(token));
    if !generated.is_empty() {
        return unique(generated);
    }
    if !plain.is_empty() {
        return unique(plain);
    }

    unique(QUOTED_TOKEN.captures_iter(text).map(|captures| captures[1].to_string()))
}

fn unique(candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut ids = Vec::new();
    for candidate in candidates {
        push_unique(&mut ids, &candidate);
    }
    ids
}

fn looks_generated(token: &str) -> bool {
    token.chars().any(|character| character.is_ascii_digit())
        || token.chars().skip(1).any(|character| character.is_ascii_uppercase())
}

fn service_id(text: &str) -> Option<String> {
    SERVICE_ID
        .captures(text)
        .map(|captures| captures[1].to_ascii_lowercase())
        .or_else(|| ANNOTATED_ID.captures(text).map(|captures| captures[1].to_string()))
        .or_else(|| QUOTED_TOKEN.captures(text).map(|captures| captures[1].to_string()))
}

fn table_id(text: &str) -> Option<String> {
    TABLE_ID
        .captures(text)
        .map(|captures| captures[1].to_string())
        .or_else(|| {
            NAMED_TABLE
                .captures(text)
                .map(|captures| captures[1].to_string())
                .filter(|name| !is_filler_word(name))
        })
        .or_else(|| ANNOTATED_ID.captures(text).map(|captures| captures[1].to_string()))
        .or_else(|| QUOTED_TOKEN.captures(text).map(|captures| captures[1].to_string()))
}

fn is_filler_word(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "records" | "record" | "rows" | "from" | "de" | "des" | "du" | "la" | "le" | "les" | "in"
    )
}

fn record_limit(text: &str) -> Option<u32> {
    RECORD_LIMIT.captures(text).and_then(|captures| {
        first_group(&captures, &[1, 2]).and_then(|raw| raw.parse::<u32>().ok())
    })
}

fn file_names(text: &str) -> Vec<String> {
    let mut files = Vec::new();
    for captures in QUOTED_FILE_NAME.captures_iter(text) {
        push_unique(&mut files, captures[1].trim());
    }
    let unquoted = QUOTED_FILE_NAME.replace_all(text, " ");
    for captures in BARE_FILE_NAME.captures_iter(&unquoted) {
        push_unique(&mut files, &captures[1]);
    }
    files
}

fn search_query(text: &str) -> Option<String> {
    if let Some(quoted) = QUOTED_TEXT
        .captures(text)
        .and_then(|captures| first_group(&captures, &[1, 2]))
    {
        return Some(quoted);
    }

    let tail = SEARCH_TAIL.captures(text)?.get(1)?.as_str();
    let query = SEARCH_SCOPE_SUFFIX.replace(tail, "");
    let query = query.trim().trim_end_matches(['.', '?', '!']).trim();
    (!query.is_empty()).then(|| query.to_string())
}

fn json_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then_some((start, end))
}

/// A JSON object literal embedded in the utterance, passed to the workflow
/// as execution input.
fn execution_data(text: &str) -> Option<Value> {
    let (start, end) = json_span(text)?;
    serde_json::from_str::<Value>(&text[start..=end]).ok().filter(Value::is_object)
}

/// Keys inside an execution payload must not be mistaken for identifiers.
fn without_json_literal(text: &str) -> String {
    match json_span(text) {
        Some((start, end)) => format!("{} {}", &text[..start], &text[end + 1..]),
        None => text.to_string(),
    }
}

fn first_group(captures: &regex::Captures<'_>, groups: &[usize]) -> Option<String> {
    groups
        .iter()
        .find_map(|index| captures.get(*index))
        .map(|matched| matched.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn push_unique(values: &mut Vec<String>, candidate: &str) {
    if !values.iter().any(|existing| existing == candidate) {
        values.push(candidate.to_string());
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
