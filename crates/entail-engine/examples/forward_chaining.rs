use entail_core::{ContextStore, Network, RuleKind, Wire};
use entail_engine::{Engine, Polarity};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build a small semantic network:
    //    penguin(?x) & bird(?x) => flightless(?x)
    let mut net = Network::new();
    let x = net.add_variable("?x")?;
    let tweety = net.add_base("Tweety")?;
    let opus = net.add_base("Opus")?;
    let bird = net.add_base("bird")?;
    let penguin = net.add_base("penguin")?;
    let flightless = net.add_base("flightless")?;

    let bird_x = net.add_molecular(
        "bird(?x)",
        vec![Wire::new("class", bird), Wire::new("member", x)],
    )?;
    let penguin_x = net.add_molecular(
        "penguin(?x)",
        vec![Wire::new("class", penguin), Wire::new("member", x)],
    )?;
    let flightless_x = net.add_molecular(
        "flightless(?x)",
        vec![Wire::new("class", flightless), Wire::new("member", x)],
    )?;
    net.add_rule(
        "penguin&bird=>flightless",
        RuleKind::AndEntailment,
        vec![penguin_x, bird_x],
        vec![flightless_x],
    )?;

    // Ground instances.
    let bird_tweety = net.add_molecular(
        "bird(Tweety)",
        vec![Wire::new("class", bird), Wire::new("member", tweety)],
    )?;
    let bird_opus = net.add_molecular(
        "bird(Opus)",
        vec![Wire::new("class", bird), Wire::new("member", opus)],
    )?;
    let penguin_opus = net.add_molecular(
        "penguin(Opus)",
        vec![Wire::new("class", penguin), Wire::new("member", opus)],
    )?;

    // 2. Two independent belief contexts.
    let contexts = Arc::new(ContextStore::new());
    contexts.register("actual");
    contexts.register("hypothetical");

    let mut engine = Engine::new(Arc::new(net), Arc::clone(&contexts))?;

    // 3. Forward chaining in the "actual" context.
    engine.submit_belief(bird_tweety, "actual", Polarity::Positive)?;
    engine.submit_belief(bird_opus, "actual", Polarity::Positive)?;
    let stats = engine.submit_belief(penguin_opus, "actual", Polarity::Positive)?;
    println!("propagation: {stats:?}");

    // 4. Which bindings make flightless(?x) hold?
    let answer = engine.query(flightless_x, "actual")?;
    for m in &answer.matches {
        println!(
            "flightless holds under {} with supports {:?} ({})",
            m.substitution, m.supports, m.polarity
        );
    }

    // 5. The hypothetical context saw none of it.
    let empty = engine.query(flightless_x, "hypothetical")?;
    println!("hypothetical matches: {}", empty.matches.len());

    Ok(())
}
