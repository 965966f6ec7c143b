use url::Url;

use crate::providers::CiContext;

const FALLBACK_PAGES_DOMAIN: &str = "gitlab.io";

/// Builds the browsable URL of a report kept in this job's artifacts.
///
/// When a pages domain is configured and the server URL is well formed the
/// report is addressed through that domain, otherwise through `gitlab.io`
/// with the remaining project path segments.
///
/// # Arguments
///
/// * `ctx` - Resolved CI context
/// * `report_path` - Report directory relative to the project dir (e.g., "reports/allure")
/// * `plugin` - Optional plugin sub-report name
pub fn report_url(ctx: &CiContext, report_path: &str, plugin: Option<&str>) -> String {
    let (top_group, rest) = ctx
        .project_path
        .split_once('/')
        .unwrap_or((ctx.project_path.as_str(), ""));

    let mut target = format!("{}/", report_path.trim_matches('/'));
    if let Some(plugin) = plugin {
        target.push_str(plugin);
        target.push('/');
    }
    target.push_str("index.html");

    match ctx.pages_domain.as_deref() {
        Some(domain) if Url::parse(&ctx.server_url).is_ok() => format!(
            "https://{top_group}.{domain}/-/jobs/{}/artifacts/{target}",
            ctx.job_id
        ),
        _ => {
            let project = if rest.is_empty() {
                String::new()
            } else {
                format!("/-/{rest}")
            };
            format!(
                "https://{top_group}.{FALLBACK_PAGES_DOMAIN}{project}/-/jobs/{}/artifacts/{target}",
                ctx.job_id
            )
        }
    }
}

/// Clickable URL to a pipeline (e.g., <https://gitlab.com/group/project/-/pipelines/123>)
pub fn pipeline_url(server_url: &str, project_path: &str, pipeline_id: &str) -> String {
    format!(
        "{}/{project_path}/-/pipelines/{pipeline_id}",
        server_url.trim_end_matches('/')
    )
}
