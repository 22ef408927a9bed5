use researcher_memory::InsightMemory;
use researcher_memory::schema::truncate_str;

pub(crate) fn run_memory_list(memory: &InsightMemory, limit: usize) {
    let records = memory.all();
    if records.is_empty() {
        println!("no insights stored yet");
        return;
    }

    println!("insights (latest {} of {})", limit.min(records.len()), records.len());
    for (index, record) in records.iter().rev().take(limit).enumerate() {
        println!(
            "{}. [{}] {} q: {}",
            index + 1,
            record.id_short(),
            record.timestamp.format("%Y-%m-%d %H:%M"),
            truncate_str(&record.query, 60)
        );
        println!("   {}", record.insight);
    }
}

pub(crate) fn run_memory_search(memory: &InsightMemory, query: &str) {
    let ranked = memory.recall_scored(query);
    if ranked.is_empty() {
        println!("no insights match '{query}'");
        return;
    }

    for (index, hit) in ranked.iter().enumerate() {
        println!(
            "{}. [{}] overlap={} terms={}",
            index + 1,
            hit.record.id_short(),
            hit.overlap,
            hit.matched_terms.join(",")
        );
        println!("   {}", hit.record.insight);
    }
}

pub(crate) fn run_memory_stats(memory: &InsightMemory) {
    let stats = memory.stats();
    println!("── memory stats ─────────────────────────────────────");
    println!("  store:            {}", memory.store().describe());
    println!("  total:            {}", stats.total);
    println!("  distinct queries: {}", stats.distinct_queries);
    match (stats.oldest, stats.newest) {
        (Some(oldest), Some(newest)) => {
            println!("  oldest:           {}", oldest.format("%Y-%m-%d %H:%M:%S"));
            println!("  newest:           {}", newest.format("%Y-%m-%d %H:%M:%S"));
        }
        _ => println!("  (empty)"),
    }

    if !stats.top_tags.is_empty() {
        println!();
        println!("── top tags ─────────────────────────────────────────");
        for (tag, count) in &stats.top_tags {
            println!("  {tag:<20} {count}");
        }
    }
}
