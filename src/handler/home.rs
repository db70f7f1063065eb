//! Usage snippet served at `/`

use crate::http::{self, ResponseBody};
use hyper::Response;

/// Renders the shell helper that uploads through this server
pub struct HomeHandler {
    page: String,
}

impl HomeHandler {
    pub fn new(base_url: &str) -> Self {
        Self {
            page: render_usage(base_url),
        }
    }

    pub fn handle(&self) -> Response<ResponseBody> {
        http::build_text_response(self.page.clone())
    }
}

fn render_usage(base_url: &str) -> String {
    format!(
        r#"# if you are me, copy this to your ~/.bashrc
# and use it like this: share somefile.txt
# a download link will be echoed
# don't forget to replace user/pass!
function share () {{
	curl -u user:pass -F "file=@$1" {base_url}/upload
}}"#
    )
}
