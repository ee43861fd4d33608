mod adapter;
mod connection;
mod input;
mod minion;
mod output;
mod patch;
mod payload;
mod query;
mod record;
mod schema;
mod search;
#[cfg(test)]
mod test_support;
mod token;

use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value};
use std::env;

use adapter::{AdapterError, RestAdapter};
use connection::ConnectionContext;
use input::InputFormat;
use output::{OutputFormat, print_payload};
use patch::PatchOp;
use payload::Payload;
use query::QueryTerm;

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", error_message(&err));
        std::process::exit(1);
    }
}

/// Registry failures print their own message even when a resource module
/// wrapped them in context.
fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AdapterError>() {
        Some(adapter_err) => {
            log::debug!(
                "request to {} failed: {:?}",
                adapter_err.path(),
                adapter_err
            );
            format!("error: {adapter_err}")
        }
        None => format!("error: {err:#}"),
    }
}

fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config(&matches)?;

    let (group, group_matches) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("command required"))?;
    let (op, op_matches) = group_matches
        .subcommand()
        .ok_or_else(|| anyhow!("operation required"))?;

    let adapter = RestAdapter::new(connection(&config)?)?;
    let payload = match group {
        "record" => handle_record(op, op_matches, &adapter, config.input_format)?,
        "schema" => handle_schema(op, op_matches, &adapter, config.input_format)?,
        "minion" => handle_minion(op, op_matches, &adapter)?,
        "search" => handle_search(op, op_matches, &adapter)?,
        other => return Err(anyhow!("unknown command {other}")),
    };
    print_payload(&payload, config.output_format)
}

struct Config {
    host: String,
    tenant_id: String,
    auth_id: String,
    auth_key: String,
    use_tls: bool,
    skip_gateway: bool,
    jwt_secret: Option<String>,
    jwt_user_id: Option<String>,
    input_format: InputFormat,
    output_format: OutputFormat,
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let level = if flag_or_env(matches, "verbose", "MAGDA_VERBOSE") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_env("RUST_LOG")
        .filter_level(level)
        .init();

    let output_format = if matches.get_flag("raw") {
        OutputFormat::Raw
    } else if flag_or_env(matches, "yaml", "MAGDA_YAML") {
        OutputFormat::Yaml
    } else {
        OutputFormat::Json
    };

    let input_format = matches
        .get_one::<String>("input_format")
        .map(|v| InputFormat::parse(v))
        .transpose()?
        .unwrap_or(InputFormat::Auto);

    Ok(Config {
        host: string_or_env(matches, "host", "MAGDA_HOST").unwrap_or_default(),
        tenant_id: string_or_env(matches, "tenant_id", "MAGDA_TENANT_ID").unwrap_or_default(),
        auth_id: string_or_env(matches, "auth_id", "MAGDA_AUTH_ID").unwrap_or_default(),
        auth_key: string_or_env(matches, "auth_key", "MAGDA_AUTH_KEY").unwrap_or_default(),
        use_tls: flag_or_env(matches, "use_tls", "MAGDA_USE_TLS"),
        skip_gateway: flag_or_env(matches, "skip_gateway", "MAGDA_SKIP_GATEWAY"),
        jwt_secret: string_or_env(matches, "jwt_secret", "MAGDA_JWT_SECRET"),
        jwt_user_id: string_or_env(matches, "jwt_user_id", "MAGDA_JWT_USER_ID"),
        input_format,
        output_format,
    })
}

/// The gateway authenticates on our behalf. Going around it means signing
/// our own session token.
fn connection(config: &Config) -> Result<ConnectionContext> {
    let jwt_token = if config.skip_gateway {
        let (Some(user), Some(secret)) = (&config.jwt_user_id, &config.jwt_secret) else {
            return Err(anyhow!(
                "when skipping the gateway, --jwt-secret and --jwt-user-id are also required"
            ));
        };
        token::issue(user, secret)?
    } else {
        String::new()
    };
    Ok(ConnectionContext {
        host: config.host.clone(),
        tenant_id: config.tenant_id.clone(),
        auth_id: config.auth_id.clone(),
        auth_key: config.auth_key.clone(),
        jwt_token,
        use_tls: config.use_tls,
        skip_gateway: config.skip_gateway,
    })
}

fn string_or_env(matches: &ArgMatches, id: &str, var: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .or_else(|| env::var(var).ok())
        .filter(|v| !v.is_empty())
}

fn flag_or_env(matches: &ArgMatches, id: &str, var: &str) -> bool {
    matches.get_flag(id) || env::var(var).map(|v| parse_bool(&v)).unwrap_or(false)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn handle_record(
    op: &str,
    m: &ArgMatches,
    adapter: &RestAdapter,
    format: InputFormat,
) -> Result<Payload> {
    match op {
        "list" => {
            let req = record::ListRequest {
                aspects: string_arg(m, "aspects"),
                and_query: query_terms(m, "query")?,
                or_query: query_terms(m, "or_query")?,
                page_token: string_arg(m, "page_token"),
                offset: index_arg(m, "offset"),
                limit: index_arg(m, "limit"),
            };
            record::list(&req, adapter)
        }
        "read" => {
            let req = record::ReadRequest {
                id: string_arg(m, "id"),
                add_aspects: string_arg(m, "add_aspects"),
                aspect: string_arg(m, "aspect"),
            };
            record::read(&req, adapter)
        }
        "create" => record::create(&record_body(m, format)?, adapter),
        "update" => record::update(&record_body(m, format)?, adapter),
        "delete" => {
            let req = record::DeleteRequest {
                id: string_arg(m, "id"),
                aspect_name: string_arg(m, "aspect"),
            };
            record::delete(&req, adapter)
        }
        "history" => {
            let req = record::HistoryRequest {
                id: string_arg(m, "id"),
                event_id: string_arg(m, "event_id"),
                page_token: string_arg(m, "page_token"),
                offset: index_arg(m, "offset"),
                limit: index_arg(m, "limit"),
            };
            record::history(&req, adapter)
        }
        "patch" => {
            let source = data_source(m, "patch_file")?
                .ok_or_else(|| anyhow!("--patch-file or --stdin required"))?;
            let patch: Vec<PatchOp> = serde_json::from_value(input::load_value(source, format)?)
                .context("patch must be an array of JSON-Patch operations")?;
            let req = record::PatchAspectRequest {
                id: string_arg(m, "id"),
                aspect: string_arg(m, "aspect"),
                patch,
            };
            record::patch_aspect(&req, adapter)
        }
        other => Err(anyhow!("unknown record operation {other}")),
    }
}

fn record_body(m: &ArgMatches, format: InputFormat) -> Result<record::CreateRequest> {
    let mut aspects = Map::new();
    let name = m.get_one::<String>("aspect_name");
    match (name, data_source(m, "aspect_file")?) {
        (Some(name), Some(source)) => {
            let aspect = input::load_object(source, format)?;
            aspects.insert(name.clone(), Value::Object(aspect));
        }
        (Some(_), None) => return Err(anyhow!("--aspect-name needs --aspect-file or --stdin")),
        (None, Some(_)) => return Err(anyhow!("--aspect-name required with aspect data")),
        (None, None) => {}
    }
    Ok(record::CreateRequest {
        id: string_arg(m, "id"),
        name: string_arg(m, "name"),
        aspects,
        source_tag: m.get_one::<String>("source_tag").cloned(),
    })
}

fn handle_schema(
    op: &str,
    m: &ArgMatches,
    adapter: &RestAdapter,
    format: InputFormat,
) -> Result<Payload> {
    match op {
        "list" => schema::list(adapter),
        "read" => schema::read(&string_arg(m, "id"), adapter),
        "create" | "update" => {
            let source = data_source(m, "schema_file")?
                .ok_or_else(|| anyhow!("--schema-file or --stdin required"))?;
            let req = schema::CreateRequest {
                id: string_arg(m, "id"),
                name: string_arg(m, "name"),
                schema: input::load_object(source, format)?,
            };
            if op == "create" {
                schema::create(&req, adapter)
            } else {
                schema::update(&req, adapter)
            }
        }
        other => Err(anyhow!("unknown schema operation {other}")),
    }
}

fn handle_minion(op: &str, m: &ArgMatches, adapter: &RestAdapter) -> Result<Payload> {
    match op {
        "list" => minion::list(adapter),
        "create" => {
            let req = minion::CreateRequest {
                id: string_arg(m, "id"),
                url: string_arg(m, "url"),
                aspects: split_list(&string_arg(m, "aspects")),
                optional_aspects: split_list(&string_arg(m, "optional_aspects")),
            };
            minion::create(&req, adapter)
        }
        "delete" => minion::delete(&string_arg(m, "id"), adapter),
        other => Err(anyhow!("unknown minion operation {other}")),
    }
}

fn handle_search(op: &str, m: &ArgMatches, adapter: &RestAdapter) -> Result<Payload> {
    match op {
        "datasets" => {
            let req = search::DatasetSearchRequest {
                query: string_arg(m, "query"),
                offset: index_arg(m, "offset"),
                limit: index_arg(m, "limit"),
                publishers: m
                    .get_many::<String>("publisher")
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default(),
            };
            search::datasets(&req, adapter)
        }
        other => Err(anyhow!("unknown search operation {other}")),
    }
}

fn string_arg(m: &ArgMatches, id: &str) -> String {
    m.get_one::<String>(id).cloned().unwrap_or_default()
}

fn index_arg(m: &ArgMatches, id: &str) -> i64 {
    m.get_one::<i64>(id).copied().unwrap_or(-1)
}

fn query_terms(m: &ArgMatches, id: &str) -> Result<Vec<QueryTerm>> {
    m.get_many::<String>(id)
        .into_iter()
        .flatten()
        .map(|raw| QueryTerm::parse(raw))
        .collect()
}

/// `--<file_arg> PATH` or `--stdin`, never both.
fn data_source<'a>(m: &'a ArgMatches, file_arg: &str) -> Result<Option<&'a str>> {
    let file = m.get_one::<String>(file_arg).map(String::as_str);
    match (file, m.get_flag("stdin")) {
        (Some(_), true) => Err(anyhow!("use either a file or --stdin, not both")),
        (Some(file), false) => Ok(Some(file)),
        (None, true) => Ok(Some("-")),
        (None, false) => Ok(None),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn build_cli() -> Command {
    Command::new("magda-cli")
        .about("Managing records, schemas & minions in a Magda registry")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .global(true)
                .value_name("HOST")
                .help("DNS name/IP (and port) of the Magda host (env: MAGDA_HOST)"),
        )
        .arg(
            Arg::new("tenant_id")
                .long("tenant-id")
                .global(true)
                .value_name("ID")
                .help("Tenant ID (env: MAGDA_TENANT_ID)"),
        )
        .arg(
            Arg::new("auth_id")
                .long("auth-id")
                .global(true)
                .value_name("ID")
                .help("API key ID (env: MAGDA_AUTH_ID)"),
        )
        .arg(
            Arg::new("auth_key")
                .long("auth-key")
                .global(true)
                .value_name("KEY")
                .help("API key (env: MAGDA_AUTH_KEY)"),
        )
        .arg(
            Arg::new("use_tls")
                .long("use-tls")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Use https (env: MAGDA_USE_TLS)"),
        )
        .arg(
            Arg::new("skip_gateway")
                .long("skip-gateway")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Bypass the gateway and call the registry (env: MAGDA_SKIP_GATEWAY)"),
        )
        .arg(
            Arg::new("jwt_secret")
                .long("jwt-secret")
                .global(true)
                .value_name("SECRET")
                .help("Secret for signing the session token (env: MAGDA_JWT_SECRET)"),
        )
        .arg(
            Arg::new("jwt_user_id")
                .long("jwt-user-id")
                .global(true)
                .value_name("USER")
                .help("User ID for the session token (env: MAGDA_JWT_USER_ID)"),
        )
        .arg(
            Arg::new("input_format")
                .long("input-format")
                .global(true)
                .value_name("FORMAT")
                .default_value("auto")
                .value_parser(["auto", "json", "yaml"])
                .help("Format of files and stdin input (auto|json|yaml)"),
        )
        .arg(
            Arg::new("yaml")
                .long("yaml")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as YAML (env: MAGDA_YAML)"),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the response body exactly as received"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Be chatty (env: MAGDA_VERBOSE)"),
        )
        .subcommand(record_cli())
        .subcommand(schema_cli())
        .subcommand(minion_cli())
        .subcommand(search_cli())
}

fn record_cli() -> Command {
    Command::new("record")
        .about("Managing magda records")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(paging_args(
            Command::new("list")
                .about("List some records")
                .after_help("Query ops: = ! ? !? ~ !~ > >= < <= (none means =)")
                .arg(
                    Arg::new("aspects")
                        .short('a')
                        .long("aspects")
                        .value_name("NAMES")
                        .help("Comma separated aspects for which to retrieve data"),
                )
                .arg(
                    Arg::new("query")
                        .short('q')
                        .long("query")
                        .value_name("TERM")
                        .action(ArgAction::Append)
                        .help("Aspect query path:[op]value, all must match"),
                )
                .arg(
                    Arg::new("or_query")
                        .long("or-query")
                        .value_name("TERM")
                        .action(ArgAction::Append)
                        .help("Aspect query path:[op]value, any may match"),
                ),
        ))
        .subcommand(
            Command::new("read")
                .about("Read the content of a record")
                .arg(id_arg("Record ID"))
                .arg(
                    Arg::new("add_aspects")
                        .long("add-aspects")
                        .value_name("NAMES")
                        .help("Comma separated aspects to include in the record"),
                )
                .arg(
                    Arg::new("aspect")
                        .short('a')
                        .long("aspect")
                        .value_name("NAME")
                        .help("Show only this aspect of the record"),
                ),
        )
        .subcommand(aspect_data_args(
            Command::new("create")
                .about("Creates a new record")
                .arg(
                    Arg::new("id")
                        .short('i')
                        .long("id")
                        .value_name("ID")
                        .help("Record ID (defaults to a random UUID)"),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .required(true)
                        .help("Record name"),
                ),
        ))
        .subcommand(aspect_data_args(
            Command::new("update")
                .about("Update an existing record")
                .arg(id_arg("Record ID"))
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Record name (defaults to the current name)"),
                ),
        ))
        .subcommand(
            Command::new("delete")
                .about("Delete a record or one of its aspects")
                .arg(id_arg("Record ID"))
                .arg(
                    Arg::new("aspect")
                        .short('a')
                        .long("aspect")
                        .value_name("NAME")
                        .help("Only delete this aspect"),
                ),
        )
        .subcommand(paging_args(
            Command::new("history")
                .about("Get a list of all events for a record")
                .arg(id_arg("Record ID"))
                .arg(
                    Arg::new("event_id")
                        .short('e')
                        .long("event-id")
                        .value_name("ID")
                        .help("Only show this event"),
                ),
        ))
        .subcommand(
            Command::new("patch")
                .about("Apply a JSON-Patch (RFC 6902) document to a record aspect")
                .arg(id_arg("Record ID"))
                .arg(
                    Arg::new("aspect")
                        .short('a')
                        .long("aspect")
                        .value_name("NAME")
                        .required(true)
                        .help("Aspect to patch"),
                )
                .arg(
                    Arg::new("patch_file")
                        .short('f')
                        .long("patch-file")
                        .value_name("FILE")
                        .help("File containing the patch operations"),
                )
                .arg(stdin_arg("Read the patch operations from stdin")),
        )
}

fn schema_cli() -> Command {
    let schema_args = |cmd: Command| {
        cmd.arg(id_arg("Schema ID"))
            .arg(
                Arg::new("schema_file")
                    .short('f')
                    .long("schema-file")
                    .value_name("FILE")
                    .help("File containing the JSON schema"),
            )
            .arg(stdin_arg("Read the JSON schema from stdin"))
    };
    Command::new("schema")
        .about("Managing aspect schemas")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all aspect schemas"))
        .subcommand(
            Command::new("read")
                .about("Read the content of a schema")
                .arg(id_arg("Schema ID")),
        )
        .subcommand(schema_args(
            Command::new("create").about("Creates a new schema").arg(
                Arg::new("name")
                    .short('n')
                    .long("name")
                    .value_name("NAME")
                    .required(true)
                    .help("Descriptive name"),
            ),
        ))
        .subcommand(schema_args(
            Command::new("update")
                .about("Update an existing schema")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Descriptive name (defaults to the current name)"),
                ),
        ))
}

fn minion_cli() -> Command {
    Command::new("minion")
        .about("Managing minion registrations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all minion registrations"))
        .subcommand(
            Command::new("create")
                .about("Creates a new minion")
                .arg(id_arg("Minion ID"))
                .arg(
                    Arg::new("url")
                        .short('u')
                        .long("url")
                        .value_name("URL")
                        .required(true)
                        .help("Callback URL"),
                )
                .arg(
                    Arg::new("aspects")
                        .short('a')
                        .long("aspects")
                        .value_name("NAMES")
                        .required(true)
                        .help("Comma separated aspects to listen for"),
                )
                .arg(
                    Arg::new("optional_aspects")
                        .long("optional-aspects")
                        .value_name("NAMES")
                        .help("Comma separated optional aspects to listen for"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a minion hook")
                .arg(id_arg("Minion ID")),
        )
}

fn search_cli() -> Command {
    Command::new("search")
        .about("Magda full-text search")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("datasets")
                .about("Full-text search for datasets")
                .arg(
                    Arg::new("query")
                        .short('q')
                        .long("query")
                        .value_name("TEXT")
                        .help("Full-text search query"),
                )
                .arg(offset_arg())
                .arg(limit_arg())
                .arg(
                    Arg::new("publisher")
                        .short('p')
                        .long("publisher")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Filter by organisation name (repeatable)"),
                ),
        )
}

fn id_arg(help: &'static str) -> Arg {
    Arg::new("id")
        .short('i')
        .long("id")
        .value_name("ID")
        .required(true)
        .help(help)
}

fn stdin_arg(help: &'static str) -> Arg {
    Arg::new("stdin")
        .long("stdin")
        .action(ArgAction::SetTrue)
        .help(help)
}

fn offset_arg() -> Arg {
    Arg::new("offset")
        .short('o')
        .long("offset")
        .value_name("N")
        .allow_negative_numbers(true)
        .value_parser(clap::value_parser!(i64))
        .default_value("-1")
        .help("Index of the first item retrieved")
}

fn limit_arg() -> Arg {
    Arg::new("limit")
        .short('l')
        .long("limit")
        .value_name("N")
        .allow_negative_numbers(true)
        .value_parser(clap::value_parser!(i64))
        .default_value("-1")
        .help("Maximum number of items to retrieve")
}

fn paging_args(cmd: Command) -> Command {
    cmd.arg(offset_arg()).arg(limit_arg()).arg(
        Arg::new("page_token")
            .short('t')
            .long("page-token")
            .value_name("TOKEN")
            .help("Token that identifies the start of a page of results"),
    )
}

fn aspect_data_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("aspect_name")
            .short('a')
            .long("aspect-name")
            .value_name("NAME")
            .help("Name of an aspect to attach (requires --aspect-file or --stdin)"),
    )
    .arg(
        Arg::new("aspect_file")
            .short('f')
            .long("aspect-file")
            .value_name("FILE")
            .help("File containing the aspect data"),
    )
    .arg(stdin_arg("Read the aspect data from stdin"))
    .arg(
        Arg::new("source_tag")
            .long("source-tag")
            .value_name("TAG")
            .help("Source tag stored with the record"),
    )
}
