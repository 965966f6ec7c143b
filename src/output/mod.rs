mod progress;
mod summary;

pub use progress::{Phase, PhaseProgress};
pub use summary::{print_summary, PublishSummary};

use console::style;

use crate::providers::CiContext;
use crate::uploader::Backend;

/// Prints what is about to be published, and where, to stderr.
pub fn print_run_header(ctx: &CiContext, backend: Backend) {
    eprintln!("\n{}", run_header(ctx, backend));
}

fn run_header(ctx: &CiContext, backend: Backend) -> String {
    format!(
        "{} {}\n  {} build {} {} {}\n",
        style("allure-publisher").magenta().bold(),
        style(env!("CARGO_PKG_VERSION")).dim(),
        style(ctx.provider.label()).cyan(),
        style(ctx.build_order()).cyan(),
        style("→").dim(),
        style(backend.label()).cyan(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::gitlab_context;

    #[test]
    fn test_run_header_names_build_and_backend() {
        console::set_colors_enabled(false);
        let header = run_header(&gitlab_context(), Backend::GitlabArtifacts);

        assert!(header.starts_with("allure-publisher "));
        assert!(header.contains("GitLab build 200 → gitlab-artifacts"));
    }
}
