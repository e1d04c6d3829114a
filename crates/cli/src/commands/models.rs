//! `toolweave models`: Show the model catalogue.

use toolweave_agent::model::MODELS;

pub fn run() {
    println!("{:<12} {:<20} {:<18} requires", "model", "component", "model id");
    for model in MODELS {
        println!(
            "{:<12} {:<20} {:<18} {}",
            model.name,
            model.component_type,
            model.model_id,
            model.required_attrs.join(", ")
        );
    }
}
