use std::sync::Arc;

use anyhow::anyhow;

use super::course::NewCourse;
use super::{category_err, course_err, semester_err, university_err, Context, Error, Result};
use crate::entities::{
    Category, CategoryId, CategoryKind, Course, CourseId, Semester, SemesterId, University,
    UniversityId,
};
use crate::repositories::{
    CategoryRepository, CourseRepository, SemesterRepository, UniversityRepository,
};
use crate::validate;

pub const DEFAULT_CATEGORY_ICON: &str = "Briefcase";

pub struct CatalogHandler {
    pub categories: Arc<dyn CategoryRepository + Sync + Send>,
    pub universities: Arc<dyn UniversityRepository + Sync + Send>,
    pub semesters: Arc<dyn SemesterRepository + Sync + Send>,
    pub courses: Arc<dyn CourseRepository + Sync + Send>,
}

impl CatalogHandler {
    pub async fn create_category(
        &self,
        ctx: &Context,
        name: &str,
        kind: CategoryKind,
        icon: Option<String>,
    ) -> Result<Category> {
        ctx.require_admin()?;

        let category = Category {
            id: CategoryId::new(),
            name: validate::non_empty(name, "category name")?,
            kind,
            icon: icon.unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_owned()),
            universities: vec![],
            courses: vec![],
        };

        let can_insert = self
            .categories
            .insert(category.clone())
            .await
            .map_err(category_err)?;
        if !can_insert {
            return Err(Error::Validation(
                "a category with this name already exists".to_owned(),
            ));
        }

        Ok(category)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.categories.finds().await.map_err(category_err)
    }

    pub async fn category(&self, category_id: CategoryId) -> Result<Category> {
        self.categories.find(category_id).await.map_err(category_err)
    }

    pub async fn add_university(
        &self,
        ctx: &Context,
        category_id: CategoryId,
        name: &str,
    ) -> Result<University> {
        ctx.require_admin()?;

        let name = validate::non_empty(name, "university name")?;

        let category = self
            .categories
            .find(category_id)
            .await
            .map_err(category_err)?;
        if category.kind != CategoryKind::University {
            return Err(Error::Validation(
                "this category does not accept universities".to_owned(),
            ));
        }

        let university = University {
            id: UniversityId::new(),
            name,
            semesters: vec![],
        };

        let can_insert = self
            .universities
            .insert(university.clone())
            .await
            .map_err(university_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("university id duplicated")));
        }

        self.categories
            .push_university(category_id, university.id)
            .await
            .map_err(category_err)?;

        Ok(university)
    }

    pub async fn add_course_to_category(
        &self,
        ctx: &Context,
        category_id: CategoryId,
        new: NewCourse,
    ) -> Result<Course> {
        ctx.require_admin()?;

        let category = self
            .categories
            .find(category_id)
            .await
            .map_err(category_err)?;
        if category.kind != CategoryKind::General {
            return Err(Error::Validation(
                "this category does not accept direct courses".to_owned(),
            ));
        }

        let course = self.build_course(new)?;

        let can_insert = self
            .courses
            .insert(course.clone())
            .await
            .map_err(course_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("course id duplicated")));
        }

        self.categories
            .push_course(category_id, course.id)
            .await
            .map_err(category_err)?;

        Ok(course)
    }

    pub async fn universities(&self) -> Result<Vec<University>> {
        self.universities.finds().await.map_err(university_err)
    }

    pub async fn university(&self, university_id: UniversityId) -> Result<University> {
        self.universities
            .find(university_id)
            .await
            .map_err(university_err)
    }

    pub async fn semester(&self, semester_id: SemesterId) -> Result<Semester> {
        self.semesters.find(semester_id).await.map_err(semester_err)
    }

    pub async fn add_semester(
        &self,
        ctx: &Context,
        university_id: UniversityId,
        number: u32,
    ) -> Result<Semester> {
        ctx.require_admin()?;

        // parent first, so a missing university creates nothing
        let university = self
            .universities
            .find(university_id)
            .await
            .map_err(university_err)?;

        let semester = Semester {
            id: SemesterId::new(),
            number,
            courses: vec![],
        };

        let can_insert = self
            .semesters
            .insert(semester.clone())
            .await
            .map_err(semester_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("semester id duplicated")));
        }

        self.universities
            .push_semester(university.id, semester.id)
            .await
            .map_err(university_err)?;

        Ok(semester)
    }

    pub async fn add_course_to_semester(
        &self,
        ctx: &Context,
        semester_id: SemesterId,
        new: NewCourse,
    ) -> Result<Course> {
        ctx.require_admin()?;

        let semester = self
            .semesters
            .find(semester_id)
            .await
            .map_err(semester_err)?;

        let course = self.build_course(new)?;

        let can_insert = self
            .courses
            .insert(course.clone())
            .await
            .map_err(course_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("course id duplicated")));
        }

        self.semesters
            .push_course(semester.id, course.id)
            .await
            .map_err(semester_err)?;

        Ok(course)
    }

    fn build_course(&self, new: NewCourse) -> Result<Course> {
        let NewCourse {
            name,
            image,
            description,
            instructor,
            badge,
        } = new;

        Ok(Course {
            id: CourseId::new(),
            name: validate::non_empty(&name, "course name")?,
            image,
            description,
            views: 0,
            instructor,
            badge,
            resources: vec![],
            checkpoints: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserId;
    use crate::repositories::mock::InMemoryRepository;

    fn handler() -> CatalogHandler {
        CatalogHandler {
            categories: Arc::new(InMemoryRepository::<Category>::new()),
            universities: Arc::new(InMemoryRepository::<University>::new()),
            semesters: Arc::new(InMemoryRepository::<Semester>::new()),
            courses: Arc::new(InMemoryRepository::<Course>::new()),
        }
    }

    fn admin() -> Context {
        Context {
            user_id: UserId::new(),
            admin: true,
        }
    }

    fn course_named(name: &str) -> NewCourse {
        NewCourse {
            name: name.to_owned(),
            ..NewCourse::default()
        }
    }

    #[tokio::test]
    async fn general_category_takes_courses_not_universities() {
        let handler = handler();
        let admin = admin();

        let general = handler
            .create_category(&admin, "General Skills", CategoryKind::General, None)
            .await
            .unwrap();
        assert_eq!(general.icon, DEFAULT_CATEGORY_ICON);

        let course = handler
            .add_course_to_category(&admin, general.id, course_named("Public Speaking"))
            .await
            .unwrap();

        let stored = handler.category(general.id).await.unwrap();
        assert_eq!(stored.courses, vec![course.id]);
        assert!(stored.universities.is_empty());

        let err = handler
            .add_university(&admin, general.id, "MIT")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn university_category_takes_universities_not_courses() {
        let handler = handler();
        let admin = admin();

        let unis = handler
            .create_category(
                &admin,
                "Universities",
                CategoryKind::University,
                Some("GraduationCap".to_owned()),
            )
            .await
            .unwrap();

        let university = handler.add_university(&admin, unis.id, "MIT").await.unwrap();

        let stored = handler.category(unis.id).await.unwrap();
        assert_eq!(stored.universities, vec![university.id]);

        let err = handler
            .add_course_to_category(&admin, unis.id, course_named("Calculus"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn category_names_are_unique() {
        let handler = handler();
        let admin = admin();

        handler
            .create_category(&admin, "General Skills", CategoryKind::General, None)
            .await
            .unwrap();
        let err = handler
            .create_category(&admin, "General Skills", CategoryKind::General, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn semester_chain_links_parent_to_child() {
        let handler = handler();
        let admin = admin();

        let unis = handler
            .create_category(&admin, "Universities", CategoryKind::University, None)
            .await
            .unwrap();
        let university = handler.add_university(&admin, unis.id, "MIT").await.unwrap();
        let semester = handler.add_semester(&admin, university.id, 1).await.unwrap();
        let course = handler
            .add_course_to_semester(&admin, semester.id, course_named("Calculus"))
            .await
            .unwrap();

        let stored_university = handler.university(university.id).await.unwrap();
        assert_eq!(stored_university.semesters, vec![semester.id]);

        let stored_semester = handler.semester(semester.id).await.unwrap();
        assert_eq!(stored_semester.courses, vec![course.id]);

        // the course document itself is independently addressable
        handler.courses.find(course.id).await.unwrap();
    }

    #[tokio::test]
    async fn catalog_writes_are_admin_only() {
        let handler = handler();
        let member = Context {
            user_id: UserId::new(),
            admin: false,
        };

        let err = handler
            .create_category(&member, "General Skills", CategoryKind::General, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));

        let err = handler
            .add_semester(&member, UniversityId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn adding_to_a_missing_parent_fails() {
        let handler = handler();
        let admin = admin();

        let err = handler
            .add_university(&admin, CategoryId::new(), "MIT")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("category")));

        let err = handler
            .add_semester(&admin, UniversityId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("university")));

        let err = handler
            .add_course_to_semester(&admin, SemesterId::new(), course_named("Calculus"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("semester")));
    }
}
