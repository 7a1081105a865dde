//! Generation request payload
//!
//! The shape accepted by the generation route and sent as the periodic
//! benchmark request. The benchmark variant keeps every field constant except
//! the seed, which is re-randomized per invocation so repeated benchmark runs
//! do not hit backend caches.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A generation request as forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPayload {
    /// Subject preset
    pub gender: String,

    /// Whether to condition on the reference image with ControlNet
    pub controlnet: bool,

    /// Reference image URL
    pub image_url: String,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Diffusion steps
    pub steps: u32,

    /// Classifier-free guidance scale
    pub cfg: f64,

    /// Sampler eta
    pub eta: f64,

    /// Denoise strength
    pub denoise: f64,

    /// Random seed, full unsigned 32-bit range
    pub seed: u32,

    /// Free-form prompt appended by the user
    pub user_prompt: String,
}

/// Reference image served from object storage for benchmark runs. If the
/// image is unreachable the benchmark fails and the routing layer is told
/// nothing; the worker still joins the pool.
pub const BENCHMARK_IMAGE_URL: &str = "https://storage.realstagram.ai/test/women_test.png";

impl GenerationPayload {
    /// Build the benchmark payload: a minimal generation sized to measure GPU
    /// throughput, with a freshly randomized seed. Low step count keeps the
    /// run fast.
    pub fn benchmark() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            gender: "women".to_string(),
            controlnet: false,
            image_url: BENCHMARK_IMAGE_URL.to_string(),
            width: 1152,
            height: 1536,
            steps: 8,
            cfg: 2.35,
            eta: 0.5,
            denoise: 1.0,
            seed: rng.gen(),
            user_prompt: String::new(),
        }
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("payload serializes to JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_non_seed_fields_constant() {
        let a = GenerationPayload::benchmark();
        let b = GenerationPayload::benchmark();

        assert_eq!(a.gender, b.gender);
        assert_eq!(a.controlnet, b.controlnet);
        assert_eq!(a.image_url, b.image_url);
        assert_eq!((a.width, a.height), (b.width, b.height));
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.cfg, b.cfg);
        assert_eq!(a.eta, b.eta);
        assert_eq!(a.denoise, b.denoise);
        assert_eq!(a.user_prompt, b.user_prompt);
    }

    #[test]
    fn test_benchmark_shape() {
        let payload = GenerationPayload::benchmark();
        assert_eq!(payload.gender, "women");
        assert!(!payload.controlnet);
        assert_eq!(payload.image_url, BENCHMARK_IMAGE_URL);
        assert_eq!((payload.width, payload.height), (1152, 1536));
        assert_eq!(payload.steps, 8);
        assert_eq!(payload.cfg, 2.35);
        assert_eq!(payload.eta, 0.5);
        assert_eq!(payload.denoise, 1.0);
        assert!(payload.user_prompt.is_empty());
    }

    #[test]
    fn test_benchmark_seed_varies() {
        // The seed is drawn uniformly over the full u32 range; 32 draws
        // collapsing to one value does not happen with a working RNG.
        let seeds: std::collections::HashSet<u32> =
            (0..32).map(|_| GenerationPayload::benchmark().seed).collect();
        assert!(seeds.len() > 1);
    }

    #[test]
    fn test_to_value_field_names() {
        let value = GenerationPayload::benchmark().to_value();
        for field in [
            "gender", "controlnet", "image_url", "width", "height", "steps", "cfg", "eta",
            "denoise", "seed", "user_prompt",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn test_json_round_trip() {
        let payload = GenerationPayload::benchmark();
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: GenerationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }
}
