//! Integration tests for the transform registry.

use graft_templates::{
    BuiltinDependencies, LookupKind, ResolvedConfig, TableDependencies, TransformContext,
    TransformRegistry,
};

const CONFIG: &str = r#"{
    "name": "nmt",
    "display_name": "Network Manager Telecom",
    "prefix": "nmt",
    "db_name": "nmt",
    "platform": {
        "version": "7.3",
        "devenv": ["memcached", "ldap"],
        "appserver": ["ldap"],
        "tools": []
    },
    "modules": [
        { "name": "custom" },
        { "name": "comms", "version": "3.3" },
        { "name": "network_revenue_optimizer", "version": "1.2", "devSrc": "nro" },
        { "name": "dev_tools_module", "devOnly": true }
    ]
}"#;

/// Template file contents as shipped by the project template.
fn template_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            ".gitignore",
            "node_modules\n\n# START SECTION Product modules\n/dev_tools\n/custom\n# END SECTION\n",
        ),
        (
            ".devcontainer/dockerfile",
            "\
ARG CONTAINER_REGISTRY=harbor.delivery.iqgeo.cloud/releases/

# START SECTION Aliases for Injector images
# END SECTION

FROM ${CONTAINER_REGISTRY}platform-devenv:7.1

# START SECTION optional dependencies (dev)
# END SECTION

RUN myw_product fetch pip_packages

# START SECTION Copy the modules
# END SECTION
",
        ),
        (
            ".devcontainer/docker-compose.yml",
            "\
services:
    iqgeo_myproj_devserver:
        image: iqgeo-${PROJ_PREFIX:-myproj}-devenv
        volumes:
            - ../:/opt/iqgeo/platform/WebApps/myworldapp/modules:delegated
            # START SECTION
            - ../custom:/opt/iqgeo/platform/WebApps/myworldapp/modules/custom:delegated
            # END SECTION
        environment:
            MYW_DB_NAME: ${MYW_DB_NAME:-iqgeo}
",
        ),
        (
            ".devcontainer/remote_host/docker-compose.yml",
            "services:\n    app:\n        container_name: iqgeo_${PROJ_PREFIX}_remote\n",
        ),
        (
            ".devcontainer/remote_host/docker-compose-shared.yml",
            "networks:\n    default:\n        name: ${PROJ_PREFIX:-myproj}_network\n",
        ),
        (
            ".devcontainer/.env.example",
            "PROJ_PREFIX=myproj\nMYW_DB_NAME=iqgeo\nMYW_DB_HOST=postgres\n",
        ),
        (
            ".devcontainer/devcontainer.json",
            "{\n    \"name\": \"IQGeo Project Template\",\n    \"dockerComposeFile\": \"docker-compose.yml\",\n    \"service\": \"iqgeo_myproj_devserver\"\n}\n",
        ),
        (
            ".devcontainer/remote_host/devcontainer.json",
            "{\n    \"name\": \"IQGeo Project Template (Remote)\"\n}\n",
        ),
        (
            ".devcontainer/entrypoint.d/600_init_db.sh",
            "#!/bin/bash\n# START SECTION db init\n# END SECTION\n",
        ),
        (
            "deployment/dockerfile.build",
            "\
# START SECTION Aliases for Injector images
# END SECTION
FROM ${CONTAINER_REGISTRY}platform-build:7.1 AS iqgeo_builder
# START SECTION Copy the modules
# END SECTION
",
        ),
        (
            "deployment/dockerfile.appserver",
            "\
FROM ${CONTAINER_REGISTRY}platform-appserver:7.1
# START SECTION optional dependencies (build)
# END SECTION
# START SECTION optional dependencies (runtime)
# END SECTION
RUN myw_product fetch pip_packages
# START SECTION Copy modules
# END SECTION
",
        ),
        (
            "deployment/dockerfile.tools",
            "\
FROM ${CONTAINER_REGISTRY}platform-tools:7.1
# START SECTION optional dependencies (build)
# END SECTION
# START SECTION optional dependencies (runtime)
# END SECTION
",
        ),
        (
            "deployment/docker-compose.yml",
            "services:\n    app:\n        image: ${PROJ_PREFIX:-myproj}-appserver\n        environment:\n            MYW_DB_NAME: ${MYW_DB_NAME:-iqgeo}\n",
        ),
        (
            "deployment/.env.example",
            "PROJ_PREFIX=myproj\nMYW_DB_NAME=iqgeo\n",
        ),
        (
            "deployment/entrypoint.d/600_init_db.sh",
            "#!/bin/bash\nset -e\n# START SECTION db init\nmyw_db $MYW_DB_NAME install old\n# END SECTION\n",
        ),
    ]
}

fn transform(path: &str, content: &str) -> String {
    let config = ResolvedConfig::from_jsonc(CONFIG, &BuiltinDependencies).unwrap();
    let ctx = TransformContext::new(&config, &BuiltinDependencies);
    TransformRegistry::builtin()
        .apply(path, &ctx, content)
        .unwrap_or_else(|| panic!("no transform registered for {path}"))
}

#[test]
fn test_every_registered_file_has_a_fixture() {
    let registry = TransformRegistry::builtin();
    let files = template_files();

    for path in registry.paths() {
        assert!(
            files.iter().any(|(p, _)| *p == path),
            "missing fixture for {path}"
        );
    }
    assert_eq!(files.len(), registry.len());
}

#[test]
fn test_transforms_are_idempotent() {
    for (path, content) in template_files() {
        let once = transform(path, content);
        let twice = transform(path, &once);
        assert_eq!(once, twice, "transform for {path} is not idempotent");
    }
}

#[test]
fn test_transforms_change_every_fixture() {
    for (path, content) in template_files() {
        assert_ne!(transform(path, content), content, "transform for {path} did nothing");
    }
}

#[test]
fn test_devcontainer_dockerfile() {
    let (_, content) = template_files()[1];
    let out = transform(".devcontainer/dockerfile", content);

    assert_eq!(
        out,
        "\
ARG CONTAINER_REGISTRY=harbor.delivery.iqgeo.cloud/releases/

# START SECTION Aliases for Injector images
FROM ${CONTAINER_REGISTRY}comms:3.3 AS comms
# END SECTION

FROM ${CONTAINER_REGISTRY}platform-devenv:7.3

# START SECTION optional dependencies (dev)
RUN apt-get update && \\
    apt-get install -y libmemcached-dev libmemcached11 libsasl2-dev libldap2-dev osm2pgsql osmctools \\
    && apt-get autoremove && apt-get clean
# END SECTION

RUN myw_product fetch pip_packages --include memcached ldap

# START SECTION Copy the modules
COPY --link --from=comms / ${MODULES}/
# END SECTION
"
    );
}

#[test]
fn test_devcontainer_compose_mounts_local_modules() {
    let (_, content) = template_files()[2];
    let out = transform(".devcontainer/docker-compose.yml", content);

    assert!(out.contains("    iqgeo_nmt_devserver:\n"));
    assert!(out.contains("image: iqgeo-${PROJ_PREFIX:-nmt}-devenv"));
    assert!(out.contains("MYW_DB_NAME: ${MYW_DB_NAME:-nmt}"));
    assert!(out.contains(
        "            # START SECTION
            - ../custom:/opt/iqgeo/platform/WebApps/myworldapp/modules/custom:delegated
            - ../nro:/opt/iqgeo/platform/WebApps/myworldapp/modules/network_revenue_optimizer:delegated
            - ../dev_tools_module:/opt/iqgeo/platform/WebApps/myworldapp/modules/dev_tools_module:delegated
            # END SECTION
"
    ));
    // the general mount outside the region is untouched
    assert!(out.contains("            - ../:/opt/iqgeo/platform/WebApps/myworldapp/modules:delegated\n"));
}

#[test]
fn test_deployment_images() {
    let build = transform("deployment/dockerfile.build", template_files()[9].1);
    assert!(build.contains("platform-build:7.3 AS iqgeo_builder"));
    assert!(build.contains("FROM ${CONTAINER_REGISTRY}network_revenue_optimizer:1.2 AS network_revenue_optimizer"));
    assert!(build.contains("COPY --link custom ${MODULES}/custom"));
    assert!(!build.contains("dev_tools_module"));

    let tools = transform("deployment/dockerfile.tools", template_files()[11].1);
    assert!(tools.contains("platform-tools:7.3"));
    // osm is added for network_revenue_optimizer
    assert!(tools.contains("apt-get install -y osm2pgsql osmctools \\"));
}

#[test]
fn test_init_db_lists_db_modules() {
    let out = transform("deployment/entrypoint.d/600_init_db.sh", template_files()[14].1);

    assert_eq!(
        out,
        "#!/bin/bash\nset -e\n# START SECTION db init\n\
if ! myw_db $MYW_DB_NAME list versions --layout keys | grep myw_comms_schema | grep version=; then myw_db $MYW_DB_NAME install comms; fi\n\
if ! myw_db $MYW_DB_NAME list versions --layout keys | grep mywnro_schema | grep version=; then myw_db $MYW_DB_NAME install network_revenue_optimizer; fi\n\
# END SECTION\n"
    );
}

#[test]
fn test_injected_lookup_changes_packages() {
    let deps = TableDependencies::new().with(LookupKind::AptRuntime, "ldap", ["libldap-2.5-0"]);
    let config = ResolvedConfig::from_jsonc(CONFIG, &deps).unwrap();
    let ctx = TransformContext::new(&config, &deps);

    let out = TransformRegistry::builtin()
        .apply("deployment/dockerfile.appserver", &ctx, template_files()[10].1)
        .unwrap();

    assert!(out.contains("apt-get install -y libldap-2.5-0 \\"));
    // no build packages are known to this lookup
    assert!(out.contains("# START SECTION optional dependencies (build)\n# END SECTION\n"));
}
