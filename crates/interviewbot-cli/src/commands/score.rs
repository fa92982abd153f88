//! The `interviewbot score` command.

use anyhow::Result;

use interviewbot_core::scoring::{similarity_ratio, PolicyKind};

pub fn execute(response: &str, reference: &str, policy: PolicyKind, threshold: f64) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "threshold must be between 0.0 and 1.0"
    );

    let scorer = policy.build(threshold);
    if policy == PolicyKind::Similarity {
        let ratio = similarity_ratio(&response.to_lowercase(), &reference.to_lowercase());
        println!("Similarity: {ratio:.3}");
        println!("Threshold:  {threshold}");
    }
    let verdict = if scorer.is_correct(response, reference) {
        "Correct"
    } else {
        "Incorrect"
    };
    println!("Policy:     {}", scorer.name());
    println!("Verdict:    {verdict}");
    Ok(())
}
