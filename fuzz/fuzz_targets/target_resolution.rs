#![no_main]

use ferrous_wire::{module, Injector, Target, TargetType};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

struct Service {
    id: u32,
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let pattern = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let bound = pattern % 2 == 0;
    let injector = Injector::new(vec![Box::new(module::from_fn("fuzzed", move |binder| {
        if bound {
            binder.bind::<Service>().to_instance(Arc::new(Service { id: 42 }))?;
        }
        Ok(())
    }))])
    .expect("module builds");

    match (pattern >> 1) % 6 {
        0 => assert_eq!(injector.get::<Service>().is_ok(), bound),
        1 => assert_eq!(injector.get_optional::<Service>().unwrap().is_some(), bound),
        2 => {
            if let Ok(list) = injector.get_list::<Service>() {
                assert!(bound);
                assert_eq!(list[0].id, 42);
            }
        }
        3 => assert_eq!(injector.get_provider::<Service>().is_ok(), bound),
        4 => {
            // Arbitrary names must never panic, bound or not.
            if let Ok(name) = std::str::from_utf8(&data[4..]) {
                let _ = injector.get_by_name(name);
                let _ = injector.get_target(&Target::new(TargetType::by_name(name.to_owned()).list()));
            }
        }
        _ => {
            let name = String::from_utf8_lossy(&data[4..]).into_owned();
            assert!(injector.get_named::<Service>(&name).unwrap_err().is_no_binding());
        }
    }
});
