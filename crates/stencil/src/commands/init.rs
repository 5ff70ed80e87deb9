//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ConfigFile;

/// Run the init command.
pub fn run(config: &ConfigFile, config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing stencil site...");

    let site = &config.site;

    if site.pages.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite the placeholder files.",
            site.pages.display()
        );
        return Ok(());
    }

    for dir in [
        site.pages.clone(),
        site.partials.clone(),
        site.assets.join("css"),
        site.assets.join("js"),
        site.assets.join("images"),
        site.output.clone(),
    ] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    write_placeholder(&site.data, DEFAULT_DATA)?;
    write_placeholder(&site.pages.join("index.html"), DEFAULT_INDEX)?;
    write_placeholder(&site.partials.join("meta.html"), DEFAULT_META)?;
    write_placeholder(&site.assets.join("css/style.css"), DEFAULT_CSS)?;

    if !config_path.exists() {
        write_placeholder(config_path, DEFAULT_CONFIG)?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'stencil build' to render the site.");

    Ok(())
}

fn write_placeholder(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Stencil configuration

[site]
# Page templates, one output file per template
pages = "htmldocs"

# Partials shared by every page
partials = "htmldocs/common"

# Static assets copied into the output as-is
assets = "htmldocs/static"

# Built site
output = "public"

# Data available to every template
data = "htmldocs/data.json"

[build]
extensions = ["html"]

# Fail a page that uses an undefined value
strict_undefined = true

[serve]
addr = ":80"
"#;

const DEFAULT_DATA: &str = r##"{
    "menu": [
        {
            "title": "Home",
            "url": "index.html",
            "submenu": {}
        },
        {
            "title": "About",
            "url": "#",
            "submenu": {}
        }
    ]
}
"##;

const DEFAULT_INDEX: &str = r#"<!doctype html>
<html>
<head>
{% include "meta" %}
</head>
<body>
<nav>
{% for item in menu %}  <a href="{{ item.url }}">{{ item.title }}</a>
{% endfor %}</nav>
hello world!
</body>
</html>
"#;

const DEFAULT_META: &str = r#"{% define "meta" %}
    <meta http-equiv="Content-Type" content="text/html;charset=utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>hello world</title>
    <link href="css/style.css" rel="stylesheet">
{% enddefine %}
"#;

const DEFAULT_CSS: &str = r#"body {
    color: red;
    font-size: 36px;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use stencil_static::SiteBuilder;
    use tempfile::tempdir;

    fn config_in(root: &Path) -> ConfigFile {
        ConfigFile {
            site: SiteConfig {
                pages: root.join("htmldocs"),
                partials: root.join("htmldocs/common"),
                assets: root.join("htmldocs/static"),
                output: root.join("public"),
                data: root.join("htmldocs/data.json"),
            },
            ..Default::default()
        }
    }

    #[test]
    fn scaffolds_a_buildable_site() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        let config_path = temp.path().join("stencil.toml");

        run(&config, &config_path, false).unwrap();

        assert!(temp.path().join("htmldocs/static/js").is_dir());
        assert!(temp.path().join("htmldocs/static/images").is_dir());
        assert!(config_path.exists());
        assert!(ConfigFile::parse(&fs::read_to_string(&config_path).unwrap()).is_ok());

        let result = SiteBuilder::new(config.build_config(None)).build().unwrap();

        assert!(result.is_success());
        let index = fs::read_to_string(temp.path().join("public/index.html")).unwrap();
        assert!(index.contains("<title>hello world</title>"));
        assert!(index.contains(r#"<a href="index.html">Home</a>"#));
        assert!(temp.path().join("public/css/style.css").exists());
    }

    #[test]
    fn leaves_existing_site_alone() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        fs::create_dir_all(&config.site.pages).unwrap();
        fs::write(config.site.pages.join("index.html"), "mine").unwrap();

        run(&config, &temp.path().join("stencil.toml"), false).unwrap();

        assert_eq!(
            fs::read_to_string(config.site.pages.join("index.html")).unwrap(),
            "mine"
        );
        assert!(!config.site.partials.exists());
    }

    #[test]
    fn yes_rewrites_placeholders() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        fs::create_dir_all(&config.site.pages).unwrap();
        fs::write(config.site.pages.join("index.html"), "mine").unwrap();

        run(&config, &temp.path().join("stencil.toml"), true).unwrap();

        assert_eq!(
            fs::read_to_string(config.site.pages.join("index.html")).unwrap(),
            DEFAULT_INDEX
        );
    }
}
