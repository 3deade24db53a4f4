//! Transforms for the individual template files.

use std::sync::LazyLock;

use regex::Regex;

use super::helpers::{
    fetch_pip_packages, inject_modules, optional_deps, replace_all_tokens, replace_region,
    replace_token, Flavor,
};
use super::TransformContext;
use crate::deps::LookupKind;

static DEVENV_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"platform-devenv([\w-]*):\S+").unwrap());
static BUILD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"platform-build:\S+").unwrap());
static APPSERVER_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"platform-appserver:\S+").unwrap());
static TOOLS_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"platform-tools:\S+").unwrap());

static PREFIX_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{PROJ_PREFIX(?::-[^}]*)?\}").unwrap());
static DB_NAME_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{MYW_DB_NAME(?::-[^}]*)?\}").unwrap());
static DEVSERVER_SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iqgeo_myproj_devserver:").unwrap());

static ENV_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^PROJ_PREFIX=.*$").unwrap());
static ENV_DB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^MYW_DB_NAME=.*$").unwrap());

static JSON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name":\s*"(?:[^"\\]|\\.)*""#).unwrap());
static JSON_SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""service":\s*"iqgeo_[^"]*_devserver""#).unwrap());

/// JSON string literal for `value`.
fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn with_prefix_defaults(ctx: &TransformContext<'_>, content: String) -> String {
    match &ctx.config.prefix {
        Some(prefix) => {
            replace_all_tokens(&content, &PREFIX_DEFAULT, &format!("${{PROJ_PREFIX:-{prefix}}}"))
        }
        None => content,
    }
}

fn with_db_name_defaults(ctx: &TransformContext<'_>, content: String) -> String {
    match &ctx.config.db_name {
        Some(db_name) => replace_all_tokens(
            &content,
            &DB_NAME_DEFAULT,
            &format!("${{MYW_DB_NAME:-{db_name}}}"),
        ),
        None => content,
    }
}

fn with_image_tag(ctx: &TransformContext<'_>, content: String, image: &Regex, name: &str) -> String {
    match &ctx.config.platform.version {
        Some(version) => replace_all_tokens(&content, image, &format!("{name}:{version}")),
        None => content,
    }
}

pub(super) fn gitignore(ctx: &TransformContext<'_>, content: &str) -> String {
    let modules = &ctx.config.modules;

    let mut lines: Vec<String> = modules
        .iter()
        .filter(|m| m.is_external())
        .map(|m| format!("/{}", m.name))
        .collect();
    lines.push("/dev_tools".to_string());
    if !modules.iter().any(|m| m.name == "custom") {
        lines.push("/custom".to_string());
    }

    replace_region(content, "Product modules", &lines)
}

pub(super) fn devcontainer_dockerfile(ctx: &TransformContext<'_>, content: &str) -> String {
    let devenv = &ctx.config.platform.devenv;

    let content = inject_modules(content, &ctx.config.modules, Flavor::DevEnv);
    let content = optional_deps(&content, ctx.deps, devenv, LookupKind::AptDev);
    let content = fetch_pip_packages(&content, ctx.deps, devenv);

    match &ctx.config.platform.version {
        Some(version) => DEVENV_IMAGE
            .replace(&content, |caps: &regex::Captures<'_>| {
                format!("platform-devenv{}:{}", &caps[1], version)
            })
            .into_owned(),
        None => content,
    }
}

pub(super) fn devcontainer_compose(ctx: &TransformContext<'_>, content: &str) -> String {
    let mounts: Vec<String> = ctx
        .config
        .modules
        .iter()
        .filter(|m| m.is_local())
        .map(|m| {
            let src = m.dev_src.as_deref().unwrap_or(&m.name);
            format!(
                "            - ../{}:/opt/iqgeo/platform/WebApps/myworldapp/modules/{}:delegated",
                src, m.name
            )
        })
        .collect();

    let content = replace_region(content, "", &mounts);
    let content = with_prefix_defaults(ctx, content);
    let content = with_db_name_defaults(ctx, content);

    match &ctx.config.prefix {
        Some(prefix) => replace_token(
            &content,
            &DEVSERVER_SERVICE,
            &format!("iqgeo_{prefix}_devserver:"),
        ),
        None => content,
    }
}

pub(super) fn remote_host_compose(ctx: &TransformContext<'_>, content: &str) -> String {
    with_prefix_defaults(ctx, content.to_string())
}

pub(super) fn deployment_compose(ctx: &TransformContext<'_>, content: &str) -> String {
    let content = with_prefix_defaults(ctx, content.to_string());
    with_db_name_defaults(ctx, content)
}

pub(super) fn env_example(ctx: &TransformContext<'_>, content: &str) -> String {
    let mut content = content.to_string();
    if let Some(prefix) = &ctx.config.prefix {
        content = replace_token(&content, &ENV_PREFIX, &format!("PROJ_PREFIX={prefix}"));
    }
    if let Some(db_name) = &ctx.config.db_name {
        content = replace_token(&content, &ENV_DB_NAME, &format!("MYW_DB_NAME={db_name}"));
    }
    content
}

pub(super) fn devcontainer_json(ctx: &TransformContext<'_>, content: &str) -> String {
    let mut content = content.to_string();
    if let Some(display_name) = &ctx.config.display_name {
        content = replace_token(
            &content,
            &JSON_NAME,
            &format!("\"name\": {}", json_string(display_name)),
        );
    }
    if let Some(prefix) = &ctx.config.prefix {
        content = replace_token(
            &content,
            &JSON_SERVICE,
            &format!("\"service\": \"iqgeo_{prefix}_devserver\""),
        );
    }
    content
}

pub(super) fn remote_host_devcontainer_json(ctx: &TransformContext<'_>, content: &str) -> String {
    match &ctx.config.display_name {
        Some(display_name) => replace_token(
            content,
            &JSON_NAME,
            &format!("\"name\": {}", json_string(&format!("{display_name} (Remote)"))),
        ),
        None => content.to_string(),
    }
}

pub(super) fn build_dockerfile(ctx: &TransformContext<'_>, content: &str) -> String {
    let content = inject_modules(content, &ctx.config.modules, Flavor::Deployment);
    with_image_tag(ctx, content, &BUILD_IMAGE, "platform-build")
}

pub(super) fn appserver_dockerfile(ctx: &TransformContext<'_>, content: &str) -> String {
    let appserver = &ctx.config.platform.appserver;

    let content = optional_deps(content, ctx.deps, appserver, LookupKind::AptBuild);
    let content = optional_deps(&content, ctx.deps, appserver, LookupKind::AptRuntime);
    let content = fetch_pip_packages(&content, ctx.deps, appserver);
    let content = with_image_tag(ctx, content, &APPSERVER_IMAGE, "platform-appserver");

    let copies: Vec<String> = ctx
        .config
        .modules
        .iter()
        .filter(|m| !m.dev_only)
        .map(|m| {
            format!(
                "COPY --chown=www-data:www-data --from=iqgeo_builder ${{MODULES}}/{0}/ ${{MODULES}}/{0}/",
                m.name
            )
        })
        .collect();
    replace_region(&content, "Copy modules", &copies)
}

pub(super) fn tools_dockerfile(ctx: &TransformContext<'_>, content: &str) -> String {
    let tools = &ctx.config.platform.tools;

    let content = optional_deps(content, ctx.deps, tools, LookupKind::AptBuild);
    let content = optional_deps(&content, ctx.deps, tools, LookupKind::AptRuntime);
    with_image_tag(ctx, content, &TOOLS_IMAGE, "platform-tools")
}

pub(super) fn init_db(ctx: &TransformContext<'_>, content: &str) -> String {
    let guards: Vec<String> = ctx
        .config
        .modules
        .iter()
        .filter(|m| m.db_init)
        .filter_map(|m| {
            m.schema_version_name.as_ref().map(|schema| {
                format!(
                    "if ! myw_db $MYW_DB_NAME list versions --layout keys | grep {} | grep version=; then myw_db $MYW_DB_NAME install {}; fi",
                    schema, m.name
                )
            })
        })
        .collect();

    replace_region(content, "db init", &guards)
}
