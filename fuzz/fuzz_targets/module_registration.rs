#![no_main]

use ferrous_wire::{module, Injector, ItemBinding, Module, PrivateModule};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum Op {
    Instance(u32),
    Named(u32),
    Items(u16, bool),
    Private(u64),
}

fn decode(data: &[u8]) -> Vec<Vec<Op>> {
    data.chunks(3)
        .filter(|chunk| chunk.len() == 3)
        .fold(vec![Vec::new()], |mut modules, chunk| {
            let value = u16::from_le_bytes([chunk[1], chunk[2]]);
            let op = match chunk[0] % 6 {
                0 => Op::Instance(value as u32),
                1 => Op::Named(value as u32),
                2 => Op::Items(value, false),
                3 => Op::Items(value, true),
                4 => Op::Private(value as u64),
                _ => {
                    // Start the next module.
                    modules.push(Vec::new());
                    return modules;
                }
            };
            if let Some(current) = modules.last_mut() {
                current.push(op);
            }
            modules
        })
}

fn build(ops: Vec<Op>) -> Box<dyn Module> {
    Box::new(module::from_fn("fuzzed", move |binder| {
        for op in &ops {
            match *op {
                Op::Instance(v) => {
                    binder.bind::<u32>().to_instance(Arc::new(v))?;
                }
                Op::Named(v) => {
                    binder.bind::<u32>().named("named").to_instance(Arc::new(v))?;
                }
                Op::Items(v, overriding) => {
                    let multi = binder.multi_bind::<u16>();
                    let multi = if overriding { multi.overriding() } else { multi };
                    multi.to_items(vec![ItemBinding::instance(Arc::new(v))])?;
                }
                Op::Private(v) => binder.install(PrivateModule::new(module::from_fn("hidden", move |b| {
                    b.bind::<u32>().named("hidden").to_instance(Arc::new(v as u32))?;
                    let exposed = b.bind::<u64>().to_instance(Arc::new(v))?;
                    b.expose(&exposed)
                })))?,
            }
        }
        Ok(())
    }))
}

fuzz_target!(|data: &[u8]| {
    let modules = decode(data);
    let ops: Vec<Op> = modules.iter().flatten().copied().collect();
    let injector = Injector::new(modules.into_iter().map(build).collect()).expect("valid modules build");

    let last_instance = ops.iter().rev().find_map(|op| match op {
        Op::Instance(v) => Some(*v),
        _ => None,
    });
    match last_instance {
        Some(v) => assert_eq!(*injector.get::<u32>().unwrap(), v),
        None => assert!(injector.get::<u32>().unwrap_err().is_no_binding()),
    }

    let mut items = Vec::new();
    let mut any_items = false;
    for op in &ops {
        if let Op::Items(v, overriding) = *op {
            if overriding {
                items.clear();
            }
            items.push(v);
            any_items = true;
        }
    }
    if any_items {
        let actual: Vec<u16> = injector.get_list::<u16>().unwrap().iter().map(|v| **v).collect();
        assert_eq!(actual, items);
    }

    assert!(injector.get_named::<u32>("hidden").unwrap_err().is_no_binding());
});
