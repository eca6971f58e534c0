//! Backend registration and dispatch
//!
//! A backend provides the AUX bus the core talks to. Backends are selected
//! with `--backend name:key=value,...` and compiled in by cargo feature.

use synapticsmst_core::AuxBus;

/// Backend used when `--backend` is not given
pub const DEFAULT_BACKEND: &str = "drm_dp_aux";

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// All backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "drm-aux")]
    backends.push(BackendInfo {
        name: "drm_dp_aux",
        aliases: &["drm-dp-aux", "aux"],
        description: "Linux /dev/drm_dp_auxN nodes (dir=<path>,device=<major:minor>)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "Emulated hub tree for testing (topology=<spec>,board=<id>)",
    });

    backends
}

/// Short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parsed backend specification
#[derive(Debug, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name as given
    pub name: String,
    /// Key-value options, in the order given
    pub options: Vec<(String, String)>,
}

impl BackendParams {
    /// Options in the form the backend crates take
    pub fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.options
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string into name and options
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    if name.is_empty() {
        return Err("Empty backend name".into());
    }

    let mut options = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                options.push((key.to_string(), value.to_string()));
            } else {
                return Err(format!("Invalid parameter format: '{}' (expected key=value)", opt).into());
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        options,
    })
}

/// Open the AUX bus named by `spec`
///
/// `device` is the `--device <major:minor>` filter; only device-node
/// backends can honour it.
#[allow(unused_mut, unused_variables)]
pub fn open_backend(
    spec: &str,
    device: Option<&str>,
) -> Result<Box<dyn AuxBus>, Box<dyn std::error::Error>> {
    let mut params = parse_backend_params(spec)?;

    match params.name.as_str() {
        #[cfg(feature = "drm-aux")]
        "drm_dp_aux" | "drm-dp-aux" | "aux" => {
            if let Some(device) = device {
                params.options.push(("device".to_string(), device.to_string()));
            }
            synapticsmst_drm_aux::open_drm_aux(&params.as_pairs())
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            if let Some(device) = device {
                log::warn!("--device {} is ignored by the dummy backend", device);
            }
            let bus = synapticsmst_dummy::parse_options(&params.as_pairs())?;
            Ok(Box::new(bus))
        }

        _ => Err(format!(
            "Unknown backend: {} [available: {}]",
            params.name,
            backend_names_short()
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let params = parse_backend_params("dummy:topology=0+0.1,board=0x0111").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(
            params.as_pairs(),
            vec![("topology", "0+0.1"), ("board", "0x0111")]
        );

        let params = parse_backend_params("drm_dp_aux").unwrap();
        assert_eq!(params.name, "drm_dp_aux");
        assert!(params.options.is_empty());

        assert!(parse_backend_params("dummy:topology").is_err());
        assert!(parse_backend_params(":dir=/dev").is_err());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(open_backend("ch341a", None).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_backend() {
        use synapticsmst_core::{AuxNode, OpenError};

        let bus = open_backend("dummy:topology=1", Some("226:1")).unwrap();
        assert!(matches!(
            bus.open(AuxNode::new(0).unwrap()),
            Err(OpenError::NotPresent)
        ));
        assert!(bus.open(AuxNode::new(1).unwrap()).is_ok());
    }
}
