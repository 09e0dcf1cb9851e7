// Static catalogs offered to front ends: roles, member prefixes and templates.
use crate::domains::platform::{BuildStep, ServiceConfig};
use once_cell::sync::Lazy;

pub const DEFAULT_BUILD_TEMPLATE: &str = "docker";
const IMAGE_PLACEHOLDER: &str = "IMAGE_NAME";
const DOCKER_BUILDER: &str = "gcr.io/cloud-builders/docker";

/// Display label -> role id.
pub static COMMON_ROLES: &[(&str, &str)] = &[
    ("Viewer", "roles/viewer"),
    ("Editor", "roles/editor"),
    ("Owner", "roles/owner"),
    ("Cloud Run Admin", "roles/run.admin"),
    ("Cloud Build Editor", "roles/cloudbuild.builds.editor"),
    ("Container Registry Admin", "roles/storage.admin"),
    ("Logs Viewer", "roles/logging.viewer"),
    ("Service Account User", "roles/iam.serviceAccountUser"),
];

pub static MEMBER_TYPES: &[(&str, &str)] = &[
    ("User", "user:"),
    ("Service Account", "serviceAccount:"),
    ("Group", "group:"),
    ("Domain", "domain:"),
];

pub static SERVICE_TEMPLATES: Lazy<Vec<(&'static str, ServiceConfig)>> = Lazy::new(|| {
    let base = |cpu: &str, memory: &str, min: u32, max: u32| ServiceConfig {
        name: "my-service".to_string(),
        image: "gcr.io/PROJECT_ID/my-service:latest".to_string(),
        cpu: cpu.to_string(),
        memory: memory.to_string(),
        min_instances: Some(min),
        max_instances: Some(max),
        ..ServiceConfig::default()
    };
    vec![
        ("basic", base("1000m", "512Mi", 0, 10)),
        ("high_performance", base("2000m", "2Gi", 1, 100)),
        ("cost_optimized", base("500m", "256Mi", 0, 5)),
    ]
});

static BUILD_TEMPLATES: Lazy<Vec<(&'static str, Vec<BuildStep>)>> = Lazy::new(|| {
    let step = |args: &[&str]| BuildStep {
        name: DOCKER_BUILDER.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    };
    vec![
        ("docker", vec![step(&["build", "-t", IMAGE_PLACEHOLDER, "."])]),
        (
            "multi_stage",
            vec![step(&["build", "-t", IMAGE_PLACEHOLDER, "-f", "Dockerfile.multi", "."])],
        ),
        (
            "with_tests",
            vec![
                step(&["build", "-t", IMAGE_PLACEHOLDER, "."]),
                step(&["run", IMAGE_PLACEHOLDER, "npm", "test"]),
            ],
        ),
    ]
});

pub fn role_id(label: &str) -> Option<&'static str> {
    COMMON_ROLES
        .iter()
        .find(|(l, _)| l.eq_ignore_ascii_case(label))
        .map(|(_, id)| *id)
}

/// Prefixes a bare identity with the member type, e.g. `("Group", "ops@x")` -> `group:ops@x`.
pub fn member(kind: &str, identity: &str) -> Option<String> {
    MEMBER_TYPES
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(kind))
        .map(|(_, prefix)| format!("{}{}", prefix, identity))
}

/// Service template with `PROJECT_ID` substituted in the image.
pub fn service_template(name: &str, project_id: &str) -> Option<ServiceConfig> {
    SERVICE_TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, cfg)| ServiceConfig {
            image: cfg.image.replace("PROJECT_ID", project_id),
            ..cfg.clone()
        })
}

pub fn build_template_names() -> impl Iterator<Item = &'static str> {
    BUILD_TEMPLATES.iter().map(|(n, _)| *n)
}

/// Steps of the named build template with the image placeholder filled in.
pub fn build_steps(template: &str, image_name: &str) -> Option<Vec<BuildStep>> {
    BUILD_TEMPLATES
        .iter()
        .find(|(n, _)| *n == template)
        .map(|(_, steps)| {
            steps
                .iter()
                .map(|s| BuildStep {
                    name: s.name.clone(),
                    args: s
                        .args
                        .iter()
                        .map(|a| if a == IMAGE_PLACEHOLDER { image_name.to_string() } else { a.clone() })
                        .collect(),
                })
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_roles_and_members() {
        assert_eq!(role_id("logs viewer"), Some("roles/logging.viewer"));
        assert_eq!(
            member("Service Account", "ci@p.iam.gserviceaccount.com").as_deref(),
            Some("serviceAccount:ci@p.iam.gserviceaccount.com")
        );
        assert!(member("Robot", "x").is_none());
    }

    #[test]
    fn service_template_substitutes_project() {
        let cfg = service_template("high_performance", "acme-prod").unwrap();
        assert_eq!(cfg.image, "gcr.io/acme-prod/my-service:latest");
        assert_eq!(cfg.memory, "2Gi");
        assert_eq!(cfg.max_instances, Some(100));
    }

    #[test]
    fn with_tests_template_has_two_steps() {
        let steps = build_steps("with_tests", "gcr.io/p/app").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].args, vec!["run", "gcr.io/p/app", "npm", "test"]);
        assert_eq!(build_template_names().count(), 3);
    }
}
