use crate::serializable_struct_with_defaults;
use anyhow::Result;
use floor_challenges::floor_layout::{AffinityConfig, Challenge, Difficulty};
use floor_utils::{jsonify, u8s_from_str};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

serializable_struct_with_defaults! {
    RunSettings {
        seed: String,
        size: Option<usize>,
        affinity: Option<AffinityConfig>,
        hyperparameters: Option<Map<String, Value>>,
    }
}

impl RunSettings {
    pub fn new(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            size: None,
            affinity: None,
            hyperparameters: None,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        match self.size {
            Some(size) => Difficulty { size },
            None => Difficulty::default(),
        }
    }

    pub fn affinity_config(&self) -> AffinityConfig {
        self.affinity.clone().unwrap_or_default()
    }

    /// The same settings and nonce always produce the same 32 byte seed.
    pub fn calc_seed(&self, nonce: u64) -> [u8; 32] {
        u8s_from_str(&format!("{}:{}", jsonify(self), nonce))
    }

    pub fn generate_challenge(&self, nonce: u64) -> Result<Challenge> {
        Challenge::generate_instance(
            &self.calc_seed(nonce),
            &self.difficulty(),
            &self.affinity_config(),
        )
    }
}
