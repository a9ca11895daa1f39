use std::{env, fs::read_to_string, time::Instant};

use anyhow::Context;
use lark_time::{
    builtins::{self, TimeModule},
    runtime::Globals,
};

fn main() -> anyhow::Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| "in.lark".to_owned());
    let code = read_to_string(&path).with_context(|| format!("cannot read {path}"))?;

    let mut globals = Globals::new();
    builtins::register_core(&mut globals);
    TimeModule::new().register(&mut globals);
    globals.freeze();

    let start = Instant::now();
    let result = globals.exec(&code);
    println!("Took {:#?}", start.elapsed());

    match result {
        Ok(module) => {
            for (name, value) in module.iter() {
                println!("{name} = {value} ({})", value.type_name());
            }
        }
        Err(diagnostic) => println!("{}", diagnostic.render(&code)),
    }
    Ok(())
}
