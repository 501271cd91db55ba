#![no_main]

//! Arbitrary bytes must either load into a table or produce an error.

use buyround::{DistributionTable, RoundEndReason, Side};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(table) = DistributionTable::from_slice(data) else {
        return;
    };

    // Lookups on a loaded table never panic, whatever the probability
    for p in [f64::NAN, -1.0, 0.0, 0.37, 1.0, 2.0] {
        for side in [Side::CounterTerrorist, Side::Terrorist] {
            let _ = table.reason_cdf(side, p);
            for reason in RoundEndReason::ALL {
                let _ = table.survivor_cdf(side, reason, p);
                for survivors in 0..=5 {
                    let _ = table.equipment_cdf(side, reason, survivors);
                }
            }
        }
        let plant = table.bomb_plant_probability(p);
        assert!((0.0..=1.0).contains(&plant), "plant probability {plant}");
    }
});
