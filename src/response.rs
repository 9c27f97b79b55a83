use axum::{
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

/// `302 Found` to `location`, appending one `Set-Cookie` per cookie.
pub fn found(location: &'static str, cookies: impl IntoIterator<Item = HeaderValue>) -> Response {
    let mut res = StatusCode::FOUND.into_response();
    let headers = res.headers_mut();
    headers.insert(LOCATION, HeaderValue::from_static(location));
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_location_and_cookies() {
        let res = found(
            "/users",
            [HeaderValue::from_static("a=1"), HeaderValue::from_static("b=2")],
        );
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[LOCATION], "/users");
        assert_eq!(res.headers().get_all(SET_COOKIE).iter().count(), 2);
    }
}
