use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use hoops_insights::insight::{Category, InsightType};
use hoops_insights::templates::TemplateSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Prints the template catalog as Markdown, one section per category.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let set = match parse_path_arg("--templates") {
        Some(path) => Arc::new(TemplateSet::load(&path)?),
        None => TemplateSet::builtin(),
    };
    info!(pools = set.len(), "template catalog loaded");

    let mut current = "";
    for (category, kind, pool) in set.pools() {
        if Category::from_key(category).is_none() {
            warn!(category, "unknown template category");
        }
        if category != current {
            println!("## {category}");
            println!();
            current = category;
        }
        println!("### {kind}");
        for template in pool {
            println!("- {template}");
        }
        println!();
    }

    if has_flag("--missing") {
        let missing: Vec<&str> = InsightType::ALL
            .iter()
            .filter(|kind| set.pool(kind.category(), **kind).is_none())
            .map(|kind| kind.as_str())
            .collect();
        println!("## without templates");
        println!();
        for kind in missing {
            println!("- {kind}");
        }
    }
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}="))
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path.trim()));
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
