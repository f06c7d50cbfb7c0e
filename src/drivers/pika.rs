//! Pika `INFO ALL` output
//!
//! An `INFO` dump is a list of `# Section` headers followed by `name:value`
//! lines. Most lines accumulate into one `pika` record for the whole block,
//! filtered and renamed per section and typed through [`FIELD_TYPES`] before
//! emission. Three line shapes become records of their own: keyspace lines
//! (`pika_keyspace`), per-command counters (`pika_cmdstat`) and replica
//! descriptors (`pika_replication`).

use crate::drivers::FormatDriver;
use crate::error::{ConfigError, FieldError, ParseError};
use crate::normalize::normalize;
use crate::parse::{Classifier, LineTag, Matcher, ParseOutput, Separator};
use crate::record::{Fields, Record, RecordBuilder, Tags};
use crate::schema::{FieldType, Schema};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MEASUREMENT: &str = "pika";
pub const KEYSPACE_MEASUREMENT: &str = "pika_keyspace";
pub const CMDSTAT_MEASUREMENT: &str = "pika_cmdstat";
pub const REPLICATION_MEASUREMENT: &str = "pika_replication";

pub const DEFAULT_PORT: u16 = 9221;

static SECTION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#\s*(?P<name>\w+)").unwrap());
static DB_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^db\d+\s").unwrap());
static KEY_KIND: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<kind>\w+?)_keys=").unwrap());
static SLAVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^slave\d+").unwrap());
static LAG_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((?P<list>.+)\)").unwrap());

/// Fields reported from the `Server` section; everything else there is dropped
const SERVER_FIELDS: &[&str] = &[
    "uptime_in_seconds",
    "pika_version",
    "arch_bits",
    "tcp_port",
    "server_id",
    "process_id",
    "thread_num",
    "sync_thread_num",
];

const RENAMES: &[(&str, &str)] = &[("uptime_in_seconds", "uptime"), ("connected_clients", "clients")];

/// Declared output types of the `pika` record
pub const FIELD_TYPES: &[(&str, FieldType)] = &[
    ("clients", FieldType::Integer),
    ("tcp_port", FieldType::Integer),
    ("arch_bits", FieldType::Integer),
    ("process_id", FieldType::Integer),
    ("connected_slaves", FieldType::Integer),
    ("evicted_keys", FieldType::Integer),
    ("expire_cycle_cpu_milliseconds", FieldType::Integer),
    ("expired_keys", FieldType::Integer),
    ("expired_stale_perc", FieldType::Float),
    ("expired_time_cap_reached_count", FieldType::Integer),
    ("instantaneous_ops_per_sec", FieldType::Integer),
    ("master_repl_offset", FieldType::Integer),
    ("pika_version", FieldType::String),
    ("thread_num", FieldType::Integer),
    ("sync_thread_num", FieldType::Integer),
    ("total_commands_processed", FieldType::Integer),
    ("total_connections_received", FieldType::Integer),
    ("uptime", FieldType::Integer),
    ("used_cpu_sys", FieldType::Float),
    ("used_cpu_sys_children", FieldType::Float),
    ("used_cpu_user", FieldType::Float),
    ("used_cpu_user_children", FieldType::Float),
    ("used_memory", FieldType::Integer),
    ("server_id", FieldType::Integer),
    ("is_bgsaving", FieldType::Integer),
    ("is_compact", FieldType::Integer),
    ("is_scaning_keyspace", FieldType::Integer),
    ("log_size", FieldType::Integer),
    ("db_fatal", FieldType::Integer),
    ("db_memtable_usage", FieldType::Integer),
    ("db_size", FieldType::Integer),
    ("db_tablereader_usage", FieldType::Integer),
];

fn keep(section: &str, name: &str) -> bool {
    if section == "Server" && !SERVER_FIELDS.contains(&name) {
        return false;
    }
    if section == "Data" && name == "db_fatal_msg" {
        return false;
    }
    if section == "Stats" && name.starts_with("compact_") {
        return false;
    }
    !name.ends_with("_human")
}

fn rename(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}

/// Parser for one server's `INFO ALL` response
#[derive(Debug, Clone)]
pub struct PikaInfoDriver {
    classifier: Classifier,
    schema: Schema,
}

impl Default for PikaInfoDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PikaInfoDriver {
    pub fn new() -> Self {
        Self {
            classifier: Classifier::new(Separator::Colon)
                .on(Matcher::LinePrefix("# Time:"), LineTag::Ignorable)
                .on(Matcher::LinePrefix("# Duration:"), LineTag::Ignorable)
                .on(Matcher::LinePrefix("#"), LineTag::SectionHeader)
                .separator_when(DB_LINE.clone(), Separator::Space, "Replication"),
            schema: Schema::new(FIELD_TYPES),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl FormatDriver for PikaInfoDriver {
    fn name(&self) -> &'static str {
        MEASUREMENT
    }

    /// Parse a whole `INFO` response
    ///
    /// `role` is not a field: it becomes the `replication_role` tag of every
    /// record emitted after it, including the final `pika` record.
    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        let mut output = ParseOutput::default();
        let mut running = base_tags.clone();
        let mut fields = Fields::new();
        let mut section = String::new();
        let mut seen_header = false;

        for raw in block.lines() {
            let line = self.classifier.classify(raw, &section);
            match line.tag {
                LineTag::SectionHeader => {
                    if let Some(caps) = SECTION_NAME.captures(line.text) {
                        section = caps["name"].to_string();
                        seen_header = true;
                    }
                    continue;
                }
                LineTag::RecordField => {}
                _ => continue,
            }

            let name = line.key();
            let value = line.value();
            if !keep(&section, name) {
                continue;
            }
            if name == "role" {
                running.insert("replication_role".to_string(), value.to_string());
                continue;
            }

            match section.as_str() {
                "Keyspace" => {
                    if let Some(record) = keyspace_record(name, value, &running, &mut output.field_errors) {
                        output.records.push(record);
                    }
                    continue;
                }
                "Command_Exec_Count" => {
                    if let Some(record) = cmdstat_record(name, value, &running, &mut output.field_errors) {
                        output.records.push(record);
                    }
                    continue;
                }
                "Replication" if SLAVE.is_match(name) => {
                    output.records.push(replication_record(value, &running));
                    continue;
                }
                _ => {}
            }

            fields.insert(rename(name).to_string(), normalize(value));
        }

        if !seen_header {
            return Err(ParseError::Structural(
                "pika: no section header in INFO output".to_string(),
            ));
        }

        let (fields, errors) = self.schema.apply(fields);
        output.field_errors.extend(errors);
        if fields.is_empty() {
            debug!("pika: no plain fields in INFO output");
        } else {
            output.records.push(Record::new(MEASUREMENT, running, fields));
        }
        Ok(output)
    }
}

/// `db0 Strings_keys=400000080, expires=0, invalid_keys=0`
///
/// The `<Kind>_keys` count becomes field `key`; the kind becomes tag `key_type`.
fn keyspace_record(
    database: &str,
    value: &str,
    tags: &Tags,
    errors: &mut Vec<FieldError>,
) -> Option<Record> {
    if !value.contains("keys=") {
        debug!("Skipping keyspace line without key count: {} {}", database, value);
        return None;
    }
    let kind = KEY_KIND.captures(value).map(|caps| caps["kind"].to_string());

    let mut record = RecordBuilder::with_tags(tags);
    record.tag("database", database);
    if let Some(kind) = &kind {
        record.tag("key_type", kind.to_lowercase());
    }

    for part in value.split(',') {
        let Some((key, count)) = part.trim().split_once('=') else {
            continue;
        };
        let field = match &kind {
            Some(kind) if key == format!("{}_keys", kind) => "key".to_string(),
            _ => key.to_lowercase(),
        };
        match count.trim().parse::<i64>() {
            Ok(n) => record.field(field, n),
            Err(e) => errors.push(FieldError::new(field, count, e.to_string())),
        }
    }

    Some(record.finish(KEYSPACE_MEASUREMENT))
}

/// `INFO:212545`, one record per command with the count under the command name
fn cmdstat_record(name: &str, value: &str, tags: &Tags, errors: &mut Vec<FieldError>) -> Option<Record> {
    let command = name.to_lowercase();
    match value.parse::<i64>() {
        Ok(count) => {
            let mut record = RecordBuilder::with_tags(tags);
            record.tag("command", command.as_str());
            record.field(command, count);
            Some(record.finish(CMDSTAT_MEASUREMENT))
        }
        Err(e) => {
            debug!("Skipping command counter {}: {:?} {}", command, value, e);
            errors.push(FieldError::new(command, value, e.to_string()));
            None
        }
    }
}

/// `slave0:ip=pika.slave.net,port=9221,conn_fd=120,lag=(db0:0)(db1:0)`
fn replication_record(value: &str, tags: &Tags) -> Record {
    let mut record = RecordBuilder::with_tags(tags);
    record.tag("pika_role", "slave");

    for part in value.split(',') {
        let Some((key, val)) = part.split_once('=') else {
            continue;
        };
        match key {
            "ip" => record.tag("pika_ip", val),
            "port" => record.tag("pika_port", val),
            "lag" => {
                let joined = val.replace(")(", "|");
                match LAG_LIST.captures(&joined) {
                    Some(caps) => {
                        for entry in caps["list"].split('|') {
                            let Some((db, lag)) = entry.split_once(':') else {
                                continue;
                            };
                            if let Ok(lag) = lag.parse::<i64>() {
                                record.field(db, lag);
                            }
                        }
                    }
                    None => {
                        if let Ok(lag) = val.parse::<i64>() {
                            record.field("lag", lag);
                        }
                    }
                }
            }
            _ => match val.parse::<i64>() {
                Ok(n) => record.field(key, n),
                Err(_) => debug!("Skipping non-integer replica value {}={}", key, val),
            },
        }
    }

    record.finish(REPLICATION_MEASUREMENT)
}

/// Address of one pika server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl ServerAddress {
    /// Tags identifying the server on every record
    pub fn base_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("server".to_string(), self.host.clone());
        tags.insert("port".to_string(), self.port.to_string());
        tags
    }

    /// `redis-cli` arguments that dump `INFO ALL` from this server
    pub fn info_args(&self) -> Vec<String> {
        let mut args = vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if let Some(password) = &self.password {
            args.extend(["-a".to_string(), password.clone(), "--no-auth-warning".to_string()]);
        }
        args.extend(["info".to_string(), "all".to_string()]);
        args
    }
}

/// Parse a server URL of the form `[tcp://][:password@]host[:port]`
///
/// A missing scheme is accepted with a warning. The port defaults to 9221.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] for an unsupported scheme, an empty
/// host or a port that is not a number.
pub fn parse_server_url(url: &str) -> Result<ServerAddress, ConfigError> {
    let rest = match url.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some((scheme, _)) => {
            return Err(ConfigError::ValidationError(format!(
                "pika server {}: unsupported scheme {}",
                url, scheme
            )))
        }
        None => {
            warn!("Server URL {} found without scheme; please update your configuration file", url);
            url
        }
    };

    let (userinfo, hostport) = match rest.rsplit_once('@') {
        Some((user, host)) => (Some(user), host),
        None => (None, rest),
    };
    let password = userinfo
        .and_then(|u| u.split_once(':'))
        .map(|(_, pw)| pw.to_string())
        .filter(|pw| !pw.is_empty());

    let (host, port) = match hostport.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|e| {
                ConfigError::ValidationError(format!("pika server {}: bad port {:?}: {}", url, port, e))
            })?;
            (host, port)
        }
        None => (hostport, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(ConfigError::ValidationError(format!("pika server {}: empty host", url)));
    }

    Ok(ServerAddress {
        host: host.to_string(),
        port,
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    const INFO: &str = "# Server
pika_version:3.4.0
pika_git_sha:
pika_build_compile_date: May 13 2021
os:Linux 3.10.0-957.21.2.el7.x86_64 x86_64
arch_bits:64
process_id:70873
tcp_port:9221
thread_num:4
sync_thread_num:6
uptime_in_seconds:2219496
uptime_in_days:27
config_file:/opt/pika/conf/pika.conf
server_id:1

# Data
db_size:26109074480
db_size_human:24899M
log_size:998386500
log_size_human:952M
compression:snappy
used_memory:842578990
used_memory_human:803M
db_memtable_usage:32000
db_tablereader_usage:842546990
db_fatal:0
db_fatal_msg:NULL

# Clients
connected_clients:1

# Stats
total_connections_received:100551
instantaneous_ops_per_sec:0
total_commands_processed:513085913
is_bgsaving:No
is_scaning_keyspace:No
is_compact:No
compact_cron:02-04/20
compact_interval:

# Command_Exec_Count
CLIENT:1
INFO:212545
TCMALLOC:1
FLUSHDB:1
SELECT:5
AUTH:100402
GET:4
SET:412772720
CONFIG:169
COMPACT:1
BGSAVE:19
SLOWLOG:1
KEYS:7
SETEX:100000037

# CPU
used_cpu_sys:114714.65
used_cpu_user:83025.21
used_cpu_sys_children:0.01
used_cpu_user_children:0.01

# Replication(MASTER)
role:master
connected_slaves:1
slave0:ip=pika.slave.net,port=9221,conn_fd=120,lag=(db0:0)(db1:0)(db2:0)(db3:0)
db0 binlog_offset=813 29855587,safety_purge=write2file803
db1 binlog_offset=0 80,safety_purge=none
db2 binlog_offset=0 80,safety_purge=none
db3 binlog_offset=0 0,safety_purge=none

# Keyspace
# Time:2021-05-31 12:34:17
# Duration: 360s
db0 Strings_keys=400000080, expires=0, invalid_keys=0
db0 Hashes_keys=0, expires=0, invalid_keys=0
db0 Lists_keys=0, expires=0, invalid_keys=0
db0 Zsets_keys=0, expires=0, invalid_keys=0
db0 Sets_keys=0, expires=0, invalid_keys=0

# Time:2021-05-31 12:40:17
# Duration: 0s
db1 Strings_keys=1, expires=0, invalid_keys=0
db1 Hashes_keys=0, expires=0, invalid_keys=0
";

    fn host_tags() -> Tags {
        let mut tags = Tags::new();
        tags.insert("host".to_string(), "pika.net".to_string());
        tags
    }

    fn parse(block: &str) -> ParseOutput {
        PikaInfoDriver::new().parse(block, &host_tags()).unwrap()
    }

    fn find<'a>(out: &'a ParseOutput, measurement: &str, tag: (&str, &str)) -> &'a Record {
        out.records
            .iter()
            .find(|r| r.measurement == measurement && r.tag(tag.0) == Some(tag.1))
            .unwrap()
    }

    #[test]
    fn test_main_record() {
        let out = parse(INFO);
        let pika = out.records.last().unwrap();

        assert_eq!(pika.measurement, "pika");
        assert_eq!(pika.tag("host"), Some("pika.net"));
        assert_eq!(pika.tag("replication_role"), Some("master"));

        let expected: Vec<(&str, Value)> = vec![
            ("arch_bits", Value::Int(64)),
            ("clients", Value::Int(1)),
            ("compression", Value::Str("snappy".to_string())),
            ("connected_slaves", Value::Int(1)),
            ("db_fatal", Value::Int(0)),
            ("db_memtable_usage", Value::Int(32000)),
            ("db_size", Value::Int(26109074480)),
            ("db_tablereader_usage", Value::Int(842546990)),
            ("instantaneous_ops_per_sec", Value::Int(0)),
            ("is_bgsaving", Value::Int(0)),
            ("is_compact", Value::Int(0)),
            ("is_scaning_keyspace", Value::Int(0)),
            ("log_size", Value::Int(998386500)),
            ("pika_version", Value::Str("3.4.0".to_string())),
            ("process_id", Value::Int(70873)),
            ("server_id", Value::Int(1)),
            ("sync_thread_num", Value::Int(6)),
            ("tcp_port", Value::Int(9221)),
            ("thread_num", Value::Int(4)),
            ("total_commands_processed", Value::Int(513085913)),
            ("total_connections_received", Value::Int(100551)),
            ("uptime", Value::Int(2219496)),
            ("used_cpu_sys", Value::Float(114714.65)),
            ("used_cpu_sys_children", Value::Float(0.01)),
            ("used_cpu_user", Value::Float(83025.21)),
            ("used_cpu_user_children", Value::Float(0.01)),
            ("used_memory", Value::Int(842578990)),
        ];
        for (name, value) in &expected {
            assert_eq!(pika.field(name), Some(value), "{}", name);
        }
        assert_eq!(pika.fields.len(), expected.len());
        assert!(out.field_errors.is_empty());
    }

    #[test]
    fn test_keyspace_records() {
        let out = parse(INFO);
        let keyspace: Vec<&Record> = out
            .records
            .iter()
            .filter(|r| r.measurement == "pika_keyspace")
            .collect();
        assert_eq!(keyspace.len(), 7);

        let strings = keyspace[0];
        assert_eq!(strings.tag("database"), Some("db0"));
        assert_eq!(strings.tag("key_type"), Some("strings"));
        assert_eq!(strings.tag("replication_role"), Some("master"));
        assert_eq!(strings.field("key"), Some(&Value::Int(400000080)));
        assert_eq!(strings.field("expires"), Some(&Value::Int(0)));
        assert_eq!(strings.field("invalid_keys"), Some(&Value::Int(0)));
        assert_eq!(strings.fields.len(), 3);

        assert_eq!(keyspace[6].tag("database"), Some("db1"));
        assert_eq!(keyspace[6].tag("key_type"), Some("hashes"));
    }

    #[test]
    fn test_single_keyspace_line() {
        let out = parse("# Keyspace\ndb0 Strings_keys=400000080, expires=0, invalid_keys=0\n");
        assert_eq!(out.records.len(), 1);
        let keyspace = &out.records[0];
        assert_eq!(keyspace.measurement, "pika_keyspace");
        assert_eq!(keyspace.tag("database"), Some("db0"));
        assert_eq!(keyspace.tag("key_type"), Some("strings"));
        assert_eq!(keyspace.fields.len(), 3);
    }

    #[test]
    fn test_cmdstat_records() {
        let out = parse(INFO);
        let info = find(&out, "pika_cmdstat", ("command", "info"));
        assert_eq!(info.field("info"), Some(&Value::Int(212545)));
        assert_eq!(info.fields.len(), 1);
        // emitted before the role line, so no replication_role yet
        assert_eq!(info.tag("replication_role"), None);
        assert_eq!(
            out.records.iter().filter(|r| r.measurement == "pika_cmdstat").count(),
            14
        );
    }

    #[test]
    fn test_cmdstat_non_numeric_count_is_skipped() {
        let out = parse("# Command_Exec_Count\nGET:many\nSET:3\n");
        let cmdstat: Vec<&Record> = out
            .records
            .iter()
            .filter(|r| r.measurement == "pika_cmdstat")
            .collect();
        assert_eq!(cmdstat.len(), 1);
        assert_eq!(cmdstat[0].tag("command"), Some("set"));
        assert_eq!(out.field_errors[0].field, "get");
    }

    #[test]
    fn test_replication_record() {
        let out = parse(INFO);
        let slave = find(&out, "pika_replication", ("pika_role", "slave"));
        assert_eq!(slave.tag("pika_ip"), Some("pika.slave.net"));
        assert_eq!(slave.tag("pika_port"), Some("9221"));
        assert_eq!(slave.tag("replication_role"), Some("master"));
        assert_eq!(slave.tag("host"), Some("pika.net"));
        assert_eq!(slave.field("conn_fd"), Some(&Value::Int(120)));
        for db in ["db0", "db1", "db2", "db3"] {
            assert_eq!(slave.field(db), Some(&Value::Int(0)), "{}", db);
        }
        assert_eq!(slave.fields.len(), 5);
    }

    #[test]
    fn test_replication_plain_lag() {
        let out = parse("# Replication(SLAVE)\nslave1:ip=10.0.0.2,port=9222,lag=7,state=online\n");
        let slave = &out.records[0];
        assert_eq!(slave.field("lag"), Some(&Value::Int(7)));
        assert!(slave.field("state").is_none());
    }

    #[test]
    fn test_used_cpu_sys_stays_float() {
        let out = parse(&INFO.replace("used_cpu_sys:114714.65", "used_cpu_sys:114715"));
        let pika = out.records.last().unwrap();
        assert_eq!(pika.field("used_cpu_sys"), Some(&Value::Float(114715.0)));
    }

    #[test]
    fn test_bad_declared_field_is_dropped() {
        let out = parse(&INFO.replace("used_memory:842578990", "used_memory:unknown"));
        let pika = out.records.last().unwrap();
        assert!(pika.field("used_memory").is_none());
        assert_eq!(pika.field("db_size"), Some(&Value::Int(26109074480)));
        assert_eq!(out.field_errors.len(), 1);
    }

    #[test]
    fn test_no_section_header_is_structural() {
        let err = PikaInfoDriver::new()
            .parse("pika_version:3.4.0\nused_memory:1\n", &Tags::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::Structural(_)));
    }

    #[test]
    fn test_parse_server_url() {
        let addr = parse_server_url("tcp://localhost:9221").unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 9221);
        assert_eq!(addr.password, None);

        let addr = parse_server_url("tcp://:s3cret@192.168.99.100").unwrap();
        assert_eq!(addr.host, "192.168.99.100");
        assert_eq!(addr.port, DEFAULT_PORT);
        assert_eq!(addr.password.as_deref(), Some("s3cret"));

        let addr = parse_server_url("pika.local:9300").unwrap();
        assert_eq!(addr.port, 9300);
        assert_eq!(addr.base_tags().get("server").map(String::as_str), Some("pika.local"));
        assert_eq!(addr.base_tags().get("port").map(String::as_str), Some("9300"));

        assert!(parse_server_url("unix:///tmp/pika.sock").is_err());
        assert!(parse_server_url("tcp://host:port").is_err());
        assert!(parse_server_url("tcp://:9221").is_err());
    }

    #[test]
    fn test_info_args() {
        let mut addr = parse_server_url("tcp://db1:9221").unwrap();
        assert_eq!(addr.info_args(), vec!["-h", "db1", "-p", "9221", "info", "all"]);
        addr.password = Some("pw".to_string());
        assert!(addr.info_args().contains(&"-a".to_string()));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::record::Value;
    use quickcheck_macros::quickcheck;

    fn stats_block(bgsaving: &str, compact: &str) -> String {
        format!(
            "# Server\ntcp_port:9221\n\n# Stats\nis_bgsaving:{}\nis_compact:{}\n",
            bgsaving, compact
        )
    }

    #[test]
    fn test_boolean_words_and_integers_agree() {
        let driver = PikaInfoDriver::new();
        let words = driver.parse(&stats_block("No", "Yes"), &Tags::new()).unwrap();
        let digits = driver.parse(&stats_block("0", "1"), &Tags::new()).unwrap();
        assert_eq!(words.records, digits.records);
        assert_eq!(words.records[0].field("is_bgsaving"), Some(&Value::Int(0)));
        assert_eq!(words.records[0].field("is_compact"), Some(&Value::Int(1)));
    }

    #[quickcheck]
    fn prop_declared_types_hold(memory: u32, cpu_tenths: u32, integral_cpu: bool) -> bool {
        let cpu = if integral_cpu {
            format!("{}", cpu_tenths)
        } else {
            format!("{}.{}", cpu_tenths / 10, cpu_tenths % 10)
        };
        let block = format!("# Data\nused_memory:{}\n# CPU\nused_cpu_sys:{}\n", memory, cpu);
        let out = PikaInfoDriver::new().parse(&block, &Tags::new()).unwrap();
        let pika = &out.records[0];
        matches!(pika.field("used_memory"), Some(Value::Int(_)))
            && matches!(pika.field("used_cpu_sys"), Some(Value::Float(_)))
    }

    #[quickcheck]
    fn prop_parse_is_idempotent(counts: Vec<u16>) -> bool {
        let mut block = String::from("# Command_Exec_Count\n");
        for (i, n) in counts.iter().enumerate() {
            block.push_str(&format!("CMD{}:{}\n", i, n));
        }
        let driver = PikaInfoDriver::new();
        let first = driver.parse(&block, &Tags::new()).unwrap();
        let second = driver.parse(&block, &Tags::new()).unwrap();
        first.records.len() == counts.len()
            && serde_json::to_string(&first.records).ok() == serde_json::to_string(&second.records).ok()
    }
}
