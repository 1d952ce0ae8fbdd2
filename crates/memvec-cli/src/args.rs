//! Argument parsing for `memvec query`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use memvec_core::MetadataValue;
use memvec_retrieve::{MmrParams, Strategy, TopKParams, VectorParams};
use memvec_store::MetadataFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    TopK,
    Score,
    Vector,
    Mmr,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "topk" | "similarity" => Ok(StrategyKind::TopK),
            "score" | "similarity-with-score" => Ok(StrategyKind::Score),
            "vector" => Ok(StrategyKind::Vector),
            "mmr" => Ok(StrategyKind::Mmr),
            other => bail!("Unknown strategy '{}' (expected topk, score, vector or mmr)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub corpus: PathBuf,
    pub embeddings: Option<PathBuf>,
    pub texts: Vec<String>,
    pub vector: Option<Vec<f64>>,
    pub strategy: StrategyKind,
    pub k: Option<usize>,
    pub fetch_k: Option<usize>,
    pub lambda: Option<f64>,
    pub filter: MetadataFilter,
}

impl QueryArgs {
    /// Parse everything after `query`.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut iter = args.iter();
        let corpus = iter
            .next()
            .filter(|a| !a.starts_with("--"))
            .ok_or_else(|| anyhow!("Missing corpus path"))?;

        let mut parsed = QueryArgs {
            corpus: PathBuf::from(corpus),
            embeddings: None,
            texts: Vec::new(),
            vector: None,
            strategy: StrategyKind::TopK,
            k: None,
            fetch_k: None,
            lambda: None,
            filter: MetadataFilter::new(),
        };

        while let Some(flag) = iter.next() {
            let mut value = || {
                iter.next()
                    .ok_or_else(|| anyhow!("Flag {} needs a value", flag))
            };
            match flag.as_str() {
                "--embeddings" => parsed.embeddings = Some(PathBuf::from(value()?)),
                "--text" => parsed.texts.push(value()?.clone()),
                "--vector" => parsed.vector = Some(parse_vector(value()?)?),
                "--strategy" => parsed.strategy = value()?.parse()?,
                "--k" => parsed.k = Some(parse_num(flag, value()?)?),
                "--fetch-k" => parsed.fetch_k = Some(parse_num(flag, value()?)?),
                "--lambda" => parsed.lambda = Some(parse_num(flag, value()?)?),
                "--filter" => {
                    let (key, raw) = value()?
                        .split_once('=')
                        .ok_or_else(|| anyhow!("--filter expects key=value"))?;
                    parsed.filter = parsed.filter.equals(key, parse_metadata_value(raw));
                }
                other => bail!("Unknown flag: {}", other),
            }
        }

        if parsed.vector.is_none() && parsed.texts.is_empty() {
            bail!("Give a query with --vector or at least one --text");
        }
        if parsed.vector.is_some() && !parsed.texts.is_empty() {
            bail!("--vector and --text cannot be combined");
        }
        if parsed.strategy == StrategyKind::Vector && parsed.vector.is_none() {
            bail!("--strategy vector requires --vector");
        }
        if !parsed.texts.is_empty() && parsed.embeddings.is_none() {
            bail!("--text queries need an --embeddings table");
        }
        Ok(parsed)
    }

    pub fn to_strategy(&self) -> Strategy {
        let filter = (!self.filter.is_empty()).then(|| self.filter.clone());
        let top_k = TopKParams { k: self.k, filter };

        match self.strategy {
            StrategyKind::TopK => Strategy::TopK(top_k),
            StrategyKind::Score => Strategy::TopKWithScore(top_k),
            StrategyKind::Vector => Strategy::VectorDirect(VectorParams {
                vector: self.vector.clone().unwrap_or_default().into(),
                k: top_k.k,
                filter: top_k.filter,
            }),
            StrategyKind::Mmr => Strategy::Mmr(MmrParams {
                k: top_k.k,
                fetch_k: self.fetch_k,
                lambda: self.lambda,
                filter: top_k.filter,
            }),
        }
    }
}

fn parse_num<T: FromStr>(flag: &str, raw: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("Invalid value for {}: {:?}", flag, raw))
}

fn parse_vector(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid vector component {:?}", part))
        })
        .collect()
}

fn parse_metadata_value(raw: &str) -> MetadataValue {
    match raw {
        "true" => MetadataValue::Bool(true),
        "false" => MetadataValue::Bool(false),
        _ => raw
            .parse::<f64>()
            .map(MetadataValue::Number)
            .unwrap_or_else(|_| MetadataValue::from(raw)),
    }
}
