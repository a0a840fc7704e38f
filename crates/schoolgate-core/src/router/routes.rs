use crate::auth::Role;

/// Metadata for one in-app page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path pattern; `:name` segments match any single segment
    pub path: &'static str,
    pub name: &'static str,
    pub title: Option<&'static str>,
    /// Staff role required to enter, if any
    pub role: Option<Role>,
    /// Entry needs a parent token in durable storage
    pub requires_parent_token: bool,
}

impl Route {
    pub fn new(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            title: None,
            role: None,
            requires_parent_token: false,
        }
    }

    pub fn titled(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn parent_only(mut self) -> Self {
        self.requires_parent_token = true;
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(self.path);
        let mut actual = segments(path);
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(a)) if p.starts_with(':') || p == a => continue,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Canonical form of a location: leading slash, no query or fragment,
/// no trailing slash except for the root.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(&['?', '#'][..]).next().unwrap_or_default();
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

/// Ordered route list; the first matching route wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Pages of the school administration app
    pub fn school() -> Self {
        Self::new(vec![
            Route::new("/", "home").titled("Dashboard"),
            Route::new("/staff-management", "staff-management").titled("Staff & Accounts"),
            Route::new("/students", "students").titled("Students"),
            Route::new("/costs", "costs").titled("Fee Settings"),
            Route::new("/payments", "payments").titled("Payments"),
            Route::new("/savings", "savings").titled("Student Savings"),
            Route::new("/announcements", "announcements").titled("Announcements"),
            Route::new("/downloads", "downloads").titled("Downloads"),
            Route::new("/inventory", "inventory").titled("Inventory"),
            Route::new("/classes", "classes").titled("Classes"),
            Route::new("/staff", "staff").titled("Staff"),
            Route::new("/reports/handover", "handover-report").titled("Handover Report"),
            Route::new("/reports/attendance", "attendance-report"),
            Route::new("/reports/attendance/monthly", "monthly-attendance-report"),
            Route::new("/teacher/my-account", "teacher-my-account")
                .titled("My Account")
                .with_role(Role::Teacher),
            Route::new("/teacher/students", "teacher-students")
                .titled("My Students")
                .with_role(Role::Teacher),
            Route::new("/teacher/savings", "teacher-savings")
                .titled("Student Savings")
                .with_role(Role::Teacher),
            Route::new("/teacher/attendance", "teacher-attendance").with_role(Role::Teacher),
            Route::new("/admin/attendance/:classId", "admin-attendance"),
            Route::new("/holidays", "holidays"),
            Route::new("/login", "login"),
            Route::new("/parent/login", "parent-login"),
            Route::new("/parent/portal", "parent-portal").parent_only(),
        ])
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
