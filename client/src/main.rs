use anyhow::{Context, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_NODE_URL: &str = "http://localhost:8000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Search {
        term: String,
        ttl: Option<u32>,
        fanout: Option<usize>,
    },
    Peers {
        status: Option<String>,
    },
    Register {
        url: String,
    },
    Files,
    Status,
    Bootstrap,
}

#[derive(Debug)]
struct Invocation {
    base: Option<String>,
    command: Command,
}

#[derive(Serialize)]
struct ProxyResponse {
    status: u16,
    body: serde_json::Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let invocation = match parse_args(&args[1..]) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage(&args[0]);
            std::process::exit(2);
        }
    };

    let fallback = std::env::var("NODE_URL").unwrap_or_else(|_| DEFAULT_NODE_URL.to_string());
    let node_url = resolve_node_url(&fallback, invocation.base);
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("cannot build http client")?;

    let response = send(&client, &node_url, &invocation.command).await?;
    let ok = (200..300).contains(&response.status);

    match invocation.command {
        Command::Search { .. } if ok => print!("{}", render_search(&response.body)),
        _ => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Search results grouped under the peer that holds them.
fn render_search(body: &serde_json::Value) -> String {
    let mut by_peer: BTreeMap<&str, Vec<&serde_json::Value>> = BTreeMap::new();
    for result in body["results"].as_array().into_iter().flatten() {
        by_peer
            .entry(result["peer_url"].as_str().unwrap_or("?"))
            .or_default()
            .push(result);
    }

    let mut out = format!(
        "{} result(s) for {} (query {}, ttl {}, fanout {})\n",
        body["count"], body["query"], body["query_id"], body["ttl"], body["fanout_used"]
    );
    for (peer, files) in by_peer {
        out.push_str(&format!("{}\n", peer));
        for file in files {
            out.push_str(&format!(
                "  {:<32} {:>10} bytes  {}\n",
                file["file_name"].as_str().unwrap_or("?"),
                file["size"].as_u64().unwrap_or(0),
                file["checksum"].as_str().unwrap_or("")
            ));
        }
    }
    out
}

async fn send(
    client: &reqwest::Client,
    node_url: &str,
    command: &Command,
) -> anyhow::Result<ProxyResponse> {
    let request = match command {
        Command::Search { term, ttl, fanout } => {
            let mut query = vec![("query", term.clone())];
            if let Some(ttl) = ttl {
                query.push(("ttl", ttl.to_string()));
            }
            if let Some(fanout) = fanout {
                query.push(("fanout", fanout.to_string()));
            }
            client.get(format!("{}/search", node_url)).query(&query)
        }
        Command::Peers { status } => {
            let request = client.get(format!("{}/peers", node_url));
            match status {
                Some(status) => request.query(&[("status", status)]),
                None => request,
            }
        }
        Command::Register { url } => client
            .post(format!("{}/register", node_url))
            .json(&serde_json::json!({ "url": url })),
        Command::Files => client.get(format!("{}/files", node_url)),
        Command::Status => client.get(format!("{}/status", node_url)),
        Command::Bootstrap => client.post(format!("{}/bootstrap", node_url)),
    };

    tracing::debug!("Sending {:?} to {}", command, node_url);
    let resp = request
        .send()
        .await
        .with_context(|| format!("cannot reach {}", node_url))?;

    let status = resp.status().as_u16();
    let body = resp
        .json::<serde_json::Value>()
        .await
        .unwrap_or_else(|_| serde_json::json!({"error": "invalid json"}));

    Ok(ProxyResponse { status, body })
}

fn parse_args(args: &[String]) -> anyhow::Result<Invocation> {
    let mut base = None;
    let mut ttl = None;
    let mut fanout = None;
    let mut status = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("{} needs a value", flag))
        };

        match flag {
            "--base" => {
                base = Some(value()?);
                i += 2;
            }
            "--ttl" => {
                ttl = Some(value()?.parse::<u32>().context("--ttl must be a number")?);
                i += 2;
            }
            "--fanout" => {
                fanout = Some(value()?.parse::<usize>().context("--fanout must be a number")?);
                i += 2;
            }
            "--status" => {
                status = Some(value()?);
                i += 2;
            }
            other if other.starts_with("--") => bail!("unknown flag {}", other),
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("search") => Command::Search {
            term: positional.next().context("search needs a term")?,
            ttl,
            fanout,
        },
        Some("peers") => Command::Peers { status },
        Some("register") => Command::Register {
            url: positional.next().context("register needs a peer url")?,
        },
        Some("files") => Command::Files,
        Some("status") => Command::Status,
        Some("bootstrap") => Command::Bootstrap,
        Some(other) => bail!("unknown command {}", other),
        None => bail!("missing command"),
    };

    if let Some(extra) = positional.next() {
        bail!("unexpected argument {}", extra);
    }

    Ok(Invocation { base, command })
}

fn resolve_node_url(fallback: &str, override_url: Option<String>) -> String {
    let candidate = override_url.unwrap_or_else(|| fallback.to_string());
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return fallback.trim_end_matches('/').to_string();
    }

    let normalized = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    normalized.trim_end_matches('/').to_string()
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [--base <url>] <command>", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  search <term> [--ttl N] [--fanout N]   flood a query through the overlay");
    eprintln!("  peers [--status healthy|suspect|dead]  list known peers");
    eprintln!("  register <url>                         announce a peer to the node");
    eprintln!("  files                                  list the node's shared files");
    eprintln!("  status                                 show node status");
    eprintln!("  bootstrap                              re-run the friend handshake");
    eprintln!();
    eprintln!("The node defaults to $NODE_URL or {}", DEFAULT_NODE_URL);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_search_with_flags() {
        let invocation =
            parse_args(&args(&["--base", "peer2:8000", "search", "data", "--ttl", "2"])).unwrap();

        assert_eq!(invocation.base.as_deref(), Some("peer2:8000"));
        assert_eq!(
            invocation.command,
            Command::Search {
                term: "data".to_string(),
                ttl: Some(2),
                fanout: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["search"])).is_err());
        assert!(parse_args(&args(&["search", "x", "--ttl", "many"])).is_err());
        assert!(parse_args(&args(&["peers", "--status"])).is_err());
        assert!(parse_args(&args(&["launch"])).is_err());
        assert!(parse_args(&args(&["status", "extra"])).is_err());
    }

    #[test]
    fn test_render_search_groups_by_peer() {
        let body = serde_json::json!({
            "query": "data",
            "query_id": "q-1",
            "ttl": 2,
            "fanout_used": 2,
            "count": 3,
            "results": [
                {"peer_url": "http://b:8000", "file_name": "data2.txt", "size": 5, "checksum": "bb"},
                {"peer_url": "http://a:8000", "file_name": "data1.txt", "size": 4, "checksum": "aa"},
                {"peer_url": "http://b:8000", "file_name": "data3.txt", "size": 6, "checksum": "cc"}
            ]
        });

        let rendered = render_search(&body);
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].starts_with("3 result(s)"));
        assert_eq!(lines[1], "http://a:8000");
        assert!(lines[2].contains("data1.txt"));
        assert_eq!(lines[3], "http://b:8000");
        assert!(lines[4].contains("data2.txt"));
        assert!(lines[5].contains("data3.txt"));
    }

    #[test]
    fn test_resolve_node_url() {
        assert_eq!(
            resolve_node_url(DEFAULT_NODE_URL, Some("peer2:8000/".into())),
            "http://peer2:8000"
        );
        assert_eq!(
            resolve_node_url(DEFAULT_NODE_URL, Some("https://peer3".into())),
            "https://peer3"
        );
        assert_eq!(resolve_node_url("http://n1/", Some("  ".into())), "http://n1");
        assert_eq!(resolve_node_url("http://n1", None), "http://n1");
    }
}
