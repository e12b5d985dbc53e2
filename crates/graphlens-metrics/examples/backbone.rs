//! Compute metrics on a generated document and pick its backbone.
//!
//! Run with: cargo run -p graphlens-metrics --example backbone

use graphlens_core::{GraphDocumentBuilder, NodeRole};
use graphlens_metrics::{compute_with, select_backbone, MetricsConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("graphlens_metrics=debug")
        .init();

    // A few hubs with spokes, chained together.
    let mut builder = GraphDocumentBuilder::new();
    for hub in 0..20 {
        for spoke in 0..24 {
            builder = builder.edge(format!("hub{hub}"), format!("leaf{hub}_{spoke}"));
        }
        builder = builder.edge(format!("hub{hub}"), format!("hub{}", (hub + 1) % 20));
    }
    let mut doc = builder.build();
    for node in doc.nodes.iter_mut().filter(|n| n.id.as_str().ends_with("_0")) {
        node.role = NodeRole::Type;
    }
    println!("Document: {} nodes, {} edges", doc.node_count(), doc.edge_count());

    let config = MetricsConfig::from_json_str(r#"{ "seed": 2024 }"#)?;
    let metrics = compute_with(&config, &doc.node_ids(), &doc.edges)?;
    doc.attach_degrees(&metrics.degree);

    println!("Communities: {}", metrics.community_count());
    println!("Top PageRank:");
    for (id, score) in metrics.top_by_page_rank(5) {
        println!("  {id}: {score:.4}");
    }

    let backbone = select_backbone(&doc, &metrics);
    println!(
        "Backbone: {} of {} nodes ({} type nodes)",
        backbone.len(),
        doc.node_count(),
        doc.type_nodes().len()
    );

    Ok(())
}
