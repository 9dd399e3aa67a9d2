use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use igx::model::{argsort_desc, generate_greedy_stream, BuildConfig, FmModel, Model, SaModel};
use igx::tokenizer::TokenizerWrapper;

#[derive(Parser)]
#[command(name = "igx")]
#[command(about = "∞-gram language model over an indexed corpus")]
struct Cli {
    /// Path to training data
    #[arg(long = "train_file")]
    train_file: PathBuf,

    /// String that splits documents in the training data file
    #[arg(long = "line_split", default_value = "\n")]
    line_split: String,

    /// Directory to save the trained model
    #[arg(long = "out_dir")]
    out_dir: PathBuf,

    /// Number of tokenization workers
    #[arg(long = "n_workers", default_value_t = 4)]
    n_workers: usize,

    /// Path to the tokenizer configuration file
    #[arg(long = "tokenizer_config", default_value = "tokenizer_gpt2.json")]
    tokenizer_config: PathBuf,

    /// Token value added at the end of every document
    #[arg(long = "sentinal_val", default_value_t = 0)]
    sentinal_val: u16,

    /// Number of sentinels added at the end of every document
    #[arg(long = "sentinal_size", default_value_t = 2)]
    sentinal_size: usize,

    /// Minimum number of occurrences for a suffix to be valid
    #[arg(long = "min_matches", default_value_t = 1)]
    min_matches: usize,

    /// Maximum size (in MiB) of documents for each suffix-array chunk
    #[arg(long = "max_mem", default_value_t = 1024)]
    max_mem: usize,

    /// Number of most frequent continuations to print in mode 0
    #[arg(long = "top_k", default_value_t = 8)]
    top_k: usize,

    /// Number of new tokens to generate in mode 1
    #[arg(long = "num_generate", default_value_t = 32)]
    num_generate: usize,

    /// 0: print the top-k next-token continuations, 1: generate greedily
    #[arg(long = "interactive_mode", default_value_t = 0)]
    interactive_mode: u8,

    /// Use the FM-index back-end instead of the suffix array
    #[arg(long = "use_fm", default_value_t = false)]
    use_fm: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let tokenizer = TokenizerWrapper::from_file(&cli.tokenizer_config)
        .with_context(|| format!("failed to load tokenizer {}", cli.tokenizer_config.display()))?;

    let config = BuildConfig {
        line_split: cli.line_split.clone(),
        sentinel_val: cli.sentinal_val,
        sentinel_size: cli.sentinal_size,
        n_workers: cli.n_workers,
        max_mem_mib: cli.max_mem,
    };

    let model = if cli.use_fm {
        Model::FmIndex(FmModel::initialize(
            &cli.train_file,
            &cli.out_dir,
            &tokenizer,
            &config,
        )?)
    } else {
        Model::SuffixArray(SaModel::initialize(
            &cli.train_file,
            &cli.out_dir,
            &tokenizer,
            &config,
        )?)
    };

    repl(&model, &tokenizer, &cli)
}

/// Prompt loop; terminates cleanly on EOF.
fn repl(model: &Model, tokenizer: &TokenizerWrapper, cli: &Cli) -> Result<()> {
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("enter query: ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let input = line.trim_end_matches('\n').trim_end_matches('\r');

        let query_ids = match tokenizer.encode(input) {
            Ok(ids) => ids,
            Err(e) => {
                eprintln!("Error encoding input: {e}");
                continue;
            }
        };
        println!("encoded tokens: {query_ids:?}");

        if cli.interactive_mode == 0 {
            interactive_next_token(model, tokenizer, &query_ids, cli.top_k, cli.min_matches);
        } else {
            interactive_generate_greedy(
                model,
                tokenizer,
                &query_ids,
                cli.num_generate,
                cli.min_matches,
            );
        }
    }
}

/// Print the top-k continuations of the longest valid suffix.
fn interactive_next_token(
    model: &Model,
    tokenizer: &TokenizerWrapper,
    query_ids: &[u32],
    top_k: usize,
    min_matches: usize,
) {
    let prediction = model.next_token_distribution(query_ids, 1, min_matches);

    if prediction.num_retrieved == 0 {
        println!("No continuations found");
        return;
    }

    let mut top_indices = argsort_desc(&prediction.distribution);
    top_indices.truncate(top_k);

    let mut full_generation = query_ids.to_vec();
    full_generation.push(0);

    let total = prediction.num_retrieved;
    for (rank, &token) in top_indices.iter().enumerate() {
        let prob = prediction.distribution[token];
        *full_generation.last_mut().unwrap() = token as u32;

        let decoded = tokenizer
            .decode(&full_generation)
            .unwrap_or_else(|_| "<decode error>".to_string());
        println!(
            "n={}, p={:.3} ({}/{}), k={}: {}",
            prediction.effective_n,
            prob,
            (prob * total as f32) as usize,
            total,
            rank,
            decoded,
        );
    }
}

/// Stream a greedy generation, printing each intermediate sequence.
fn interactive_generate_greedy(
    model: &Model,
    tokenizer: &TokenizerWrapper,
    query_ids: &[u32],
    num_generate: usize,
    min_matches: usize,
) {
    generate_greedy_stream(model, query_ids, num_generate, min_matches, |tokens| {
        let decoded = tokenizer
            .decode(tokens)
            .unwrap_or_else(|_| "<decode error>".to_string());
        println!("====\n{decoded}");
    });
}
