use anyhow::{Context, Result};
use clap::Parser;

use kanon::data::QiSet;
use kanon::detect::{default_qi_sets, infer_quasi_identifiers, scan_dataset, PiiDetector};
use kanon::engine::{assess_dataset, top_high_risk};
use kanon::io::{read_table, save_json};
use kanon::risk::RiskThresholds;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file (.csv or .json)
    #[arg(short, long)]
    input: String,
    /// Write the combined JSON report to this file
    #[arg(short, long)]
    output: Option<String>,
    /// Quasi-identifier set as comma-separated column names; repeat the
    /// flag to test several sets
    #[arg(short, long)]
    qi: Vec<String>,
    /// Largest k still rated high risk
    #[arg(long, default_value = "2")]
    high_max: usize,
    /// Smallest k rated low risk
    #[arg(long, default_value = "10")]
    medium_max: usize,
    /// Values sampled per column during the PII scan
    #[arg(long, default_value = "100")]
    sample_size: usize,
    /// High-risk records to list
    #[arg(long, default_value = "10")]
    limit: usize,
    /// Delimiter for CSV input
    #[arg(short, long, default_value = ",")]
    delimiter: char,
    /// Suppress the text report
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let dataset = read_table(&args.input, args.delimiter).context("Could not read input file")?;
    println!(
        "Scanning {} ({} records, {} columns)",
        args.input,
        dataset.n_rows(),
        dataset.schema().len()
    );

    let detector = PiiDetector::new();
    let findings = scan_dataset(&dataset, &detector, args.sample_size);
    if findings.is_empty() {
        println!("No PII detected.");
    } else {
        println!("\nPII DETECTION RESULTS");
        for finding in &findings {
            let kinds: Vec<&str> = finding.kinds.iter().map(|kind| kind.as_str()).collect();
            println!("  {}", finding.attribute);
            println!("    PII types: {}", kinds.join(", "));
            println!("    Confidence: {:.2}", finding.confidence);
            println!("    Detections: {}", finding.detection_count);
        }
    }

    let qi_sets = if args.qi.is_empty() {
        let inferred = infer_quasi_identifiers(dataset.schema(), &findings);
        if inferred.is_empty() {
            println!("\nNo quasi-identifiers found; skipping risk assessment.");
            return Ok(());
        }
        println!("\nUsing quasi-identifiers: {}", inferred.join(", "));
        default_qi_sets(&inferred).context("Could not build QI sets")?
    } else {
        args.qi
            .iter()
            .map(|group| QiSet::new(group.split(',').map(str::trim)))
            .collect::<kanon::Result<Vec<_>>>()
            .context("Invalid --qi value")?
    };
    let labels: Vec<String> = qi_sets.iter().map(|set| set.label()).collect();
    println!(
        "Testing {} QI combinations: [{}]",
        qi_sets.len(),
        labels.join(", ")
    );

    let thresholds = RiskThresholds::new(args.high_max, args.medium_max)
        .context("Invalid risk thresholds")?;
    let (risks, report) =
        assess_dataset(&dataset, &qi_sets, thresholds).context("Risk assessment failed")?;

    if !risks.is_empty() && report.high_count == report.total_records {
        println!(
            "Warning: all {} records are high risk. The dataset may have very unique \
             value combinations, or too many quasi-identifiers are tested together.",
            report.total_records
        );
    }
    if !args.quiet {
        println!("\n{report}");
    }

    let top = top_high_risk(&risks, args.limit);
    if !top.is_empty() {
        let mut attributes: Vec<&str> = Vec::new();
        for set in &qi_sets {
            for name in set.attributes() {
                if !attributes.contains(&name.as_str()) {
                    attributes.push(name);
                }
            }
        }
        println!("HIGH-RISK RECORDS (Top {})", top.len());
        for &row in &top {
            println!("  Record {row}:");
            println!("    k-anonymity: {}", risks[row].k);
            if risks[row].unique_qi_count > 0 {
                println!(
                    "    Unique under {} of {} QI sets",
                    risks[row].unique_qi_count,
                    qi_sets.len()
                );
            }
            for name in &attributes {
                if let Some(col) = dataset.schema().index_of(name) {
                    println!("    {}: {}", name, dataset.value(row, col));
                }
            }
        }
    }

    if let Some(output) = &args.output {
        let payload = serde_json::json!({
            "pii_detection": { "fields": findings },
            "risk_assessment": report,
        });
        save_json(&payload, output).context("Could not write output file")?;
        println!("\nJSON report saved to: {output}");
    }
    Ok(())
}
