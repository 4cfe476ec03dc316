//! 前端路由表，`/` 无条件跳转到 `/home`

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "page", rename_all = "camelCase")]
pub enum Route {
    Home,
    Details { qid: Option<u64> },
    Title,
    Profile,
    Wagmi,
    QuizData,
    NotFound,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/home",
            Route::Details { .. } => "/details",
            Route::Title => "/title",
            Route::Profile => "/profile",
            Route::Wagmi => "/wagmi",
            Route::QuizData => "/quizdata",
            Route::NotFound => "/404",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    pub route: Route,
    /// 发生跳转时的目标路径
    pub redirect: Option<&'static str>,
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}

pub fn resolve(target: &str) -> ResolvedRoute {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let route = match path {
        "/" => {
            return ResolvedRoute {
                route: Route::Home,
                redirect: Some(Route::Home.path()),
            }
        }
        "/home" => Route::Home,
        // qid 非数字时按缺省处理
        "/details" => Route::Details {
            qid: query_param(query, "qid").and_then(|v| v.parse().ok()),
        },
        "/title" => Route::Title,
        "/profile" => Route::Profile,
        "/wagmi" => Route::Wagmi,
        "/quizdata" => Route::QuizData,
        _ => Route::NotFound,
    };

    ResolvedRoute {
        route,
        redirect: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_redirects_home() {
        let resolved = resolve("/");
        assert_eq!(resolved.route, Route::Home);
        assert_eq!(resolved.redirect, Some("/home"));
        assert_eq!(resolve("").redirect, Some("/home"));
    }

    #[test]
    fn test_details_qid() {
        assert_eq!(resolve("/details?qid=3").route, Route::Details { qid: Some(3) });
        assert_eq!(resolve("/details").route, Route::Details { qid: None });
        assert_eq!(resolve("/details?qid=abc").route, Route::Details { qid: None });
        assert_eq!(resolve("/details?x=1&qid=8").route, Route::Details { qid: Some(8) });
    }

    #[test]
    fn test_known_and_unknown_paths() {
        assert_eq!(resolve("/quizdata").route, Route::QuizData);
        assert_eq!(resolve("/profile/").route, Route::Profile);
        assert_eq!(resolve("/nope").route, Route::NotFound);
        assert!(resolve("/title").redirect.is_none());
    }
}
