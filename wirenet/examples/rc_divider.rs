//! Draw a small RC circuit, print its netlist, then stash it as a document.

use wirenet::prelude::*;

fn main() -> Result<(), WirenetError> {
    let mut graph = WireGraph::new(EditorContext::default());

    // supply rail, then a wire dropped onto the middle of it
    let rail = graph.draw_wire(Point::new(0.0, 0.0), Point::new(200.0, 0.0))?;
    let tap = graph.draw_wire(Point::new(100.0, 80.0), Point::new(100.0, 3.0))?;
    let bottom = graph.draw_wire(Point::new(0.0, 200.0), Point::new(200.0, 200.0))?;
    let out = graph.add_node(300.0, 80.0);

    let components = vec![
        ComponentRecord::new(1, "V", 1, "DC 5")
            .with_pin("+", Some(rail.node_id1))
            .with_pin("-", Some(bottom.node_id1)),
        ComponentRecord::new(2, "R", 1, "1k")
            .with_pin("1", Some(tap.node_id1))
            .with_pin("2", Some(out.id)),
        ComponentRecord::new(3, "C", 1, "100n")
            .with_pin("1", Some(out.id))
            .with_pin("2", Some(bottom.node_id2)),
        ComponentRecord::ground(4, 1, Some(bottom.node_id2)),
    ];

    let mut probe = ProbeRecord::new(1, ProbeKind::Voltage, Point::new(299.0, 81.0));
    probe.node = Some(out.id);
    let probes = vec![probe];

    let config = SimulationConfig {
        title: "rc example".to_string(),
        analyses: vec![Analysis::Op],
        ..Default::default()
    };
    let netlist = WirenetCore::compile(&graph, &components, &probes, &config)?;

    print!("{}", netlist.text);
    for warning in &netlist.warnings {
        eprintln!("warning: {}", warning);
    }

    if let Some(path) = std::env::args().nth(1) {
        SchematicDocument::capture(&graph, &components, &probes).save(std::path::Path::new(&path))?;
        println!("Saved document to {}", path);
    }
    Ok(())
}
