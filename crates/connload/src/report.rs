use connload_common::RunConfig;

use crate::engine::orchestrator::TestOutcome;

const RULE_WIDTH: usize = 70;

/// Rough per-connection kernel and buffer cost behind the footprint
/// estimate; held sockets carry no userspace buffers of their own.
const ESTIMATED_KB_PER_CONNECTION: f64 = 2.0;

/// Renders the final statistics snapshot to stdout. This is the program's
/// output, not telemetry, so it goes through plain `println!` rather than
/// the log subscriber.
pub fn print_report(config: &RunConfig, outcome: &TestOutcome) {
    let stats = &outcome.stats;
    let elapsed = outcome.elapsed.as_secs_f64();
    let attempted = stats.attempted();

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("📊 Concurrent Connection Capacity Report");
    println!("{}", "=".repeat(RULE_WIDTH));

    if outcome.interrupted {
        println!("\n⚠️  Run interrupted by operator; results are partial");
    }

    println!("\n⏱️  Test duration: {elapsed:.2} s");
    println!("🎯 Target connections: {}", config.connections);

    println!("\n🔗 Connection statistics:");
    println!("  ✅ Connected:    {}", stats.connected);
    println!("  ❌ Failed:       {}", stats.failed);
    if attempted > 0 {
        println!("  📊 Success rate: {:.1}%", stats.success_rate() * 100.0);
    }

    if !stats.errors.is_empty() {
        println!("\n⚠️  Error distribution:");
        let mut errors: Vec<_> = stats.errors.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        for (kind, count) in errors {
            println!("  - {kind}: {count}");
        }
    }

    if elapsed > 0.0 && stats.connected > 0 {
        let rate = stats.connected as f64 / elapsed;
        println!("\n📈 Performance:");
        println!("  Establishment rate: {rate:.1} conn/s");
        println!("  Average establish:  {:.2} ms/conn", 1000.0 / rate);
    }

    let estimated_mb = stats.connected as f64 * ESTIMATED_KB_PER_CONNECTION / 1024.0;
    println!(
        "\n💾 Estimated footprint: ~{estimated_mb:.2} MB \
         ({ESTIMATED_KB_PER_CONNECTION} KB per held connection)"
    );

    println!("\n✅ Verdict:");
    if attempted == 0 {
        println!("  ⚠️  No connection attempts were made");
    } else {
        let rate = stats.success_rate() * 100.0;
        if rate >= 99.0 {
            println!(
                "  ✨ Excellent: the target sustained {} concurrent connections",
                stats.connected
            );
        } else if rate >= 95.0 {
            println!(
                "  ✓ Good: {} concurrent connections held ({rate:.1}% success)",
                stats.connected
            );
        } else {
            println!("  ⚠️  Only {rate:.1}% of connects succeeded; a system limit was likely hit");
        }
    }

    println!("\n{}\n", "=".repeat(RULE_WIDTH));
}
